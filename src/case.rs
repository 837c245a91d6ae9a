use std::collections::BTreeMap;
use std::fmt;

/// Bus is a network node with its solved voltage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bus {
    /// Bus number.
    pub number: i32,

    /// Voltage magnitude (p.u.).
    pub voltage: f64,

    /// Voltage angle (degrees).
    pub angle: f64,
}

/// Identifies a machine by its bus and machine id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MachineKey {
    pub bus: i32,
    pub id: String,
}

/// Machine is a generator injecting power at a bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    /// Bus number.
    pub bus: i32,

    /// Machine identifier, without engine padding.
    pub id: String,

    /// Active power output (MW).
    pub p: f64,

    /// Reactive power output (MVAr).
    pub q: f64,
}

impl Machine {
    pub fn key(&self) -> MachineKey {
        MachineKey {
            bus: self.bus,
            id: self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadKey {
    pub bus: i32,
    pub id: String,
}

/// Load is a demand element at a bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    /// Bus number.
    pub bus: i32,

    /// Load identifier, without engine padding.
    pub id: String,

    /// Total active power demand (MW).
    pub p: f64,

    /// Total reactive power demand (MVAr).
    pub q: f64,
}

impl Load {
    pub fn key(&self) -> LoadKey {
        LoadKey {
            bus: self.bus,
            id: self.id.clone(),
        }
    }
}

/// Identifies a two winding transformer by its terminal buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchKey {
    pub from: i32,
    pub to: i32,
}

/// Transformer is a two winding transformer branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformer {
    /// From (primary side) bus number.
    pub from_bus: i32,

    /// To (secondary side) bus number.
    pub to_bus: i32,

    /// Primary side tap ratio (p.u. of bus base voltage).
    pub t1: f64,

    /// Secondary side tap ratio (p.u. of bus base voltage).
    pub t2: f64,
}

impl Transformer {
    pub fn key(&self) -> BranchKey {
        BranchKey {
            from: self.from_bus,
            to: self.to_bus,
        }
    }
}

// Keys render as `<bus>_<id>` / `<from>_<to>`, the form used in record
// parameter names.

impl fmt::Display for MachineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.bus, self.id)
    }
}

impl fmt::Display for LoadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.bus, self.id)
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.from, self.to)
    }
}

/// Case holds the state extracted from one loaded case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Case {
    /// Case file name without its extension.
    pub name: String,

    pub buses: BTreeMap<i32, Bus>,
    pub machines: BTreeMap<MachineKey, Machine>,
    pub loads: BTreeMap<LoadKey, Load>,
    pub transformers: BTreeMap<BranchKey, Transformer>,
}

impl Case {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
