//! Modelica record output.
//!
//! Each entity kind of a case becomes one record file holding a pair of
//! `Real` parameters per entity:
//!
//! ```txt
//! record IEEE14_voltages
//!    extends Modelica.Icons.Record;
//! // Bus number 1
//!    parameter Real V1 = 1.020000;
//!    parameter Real A1 = -3.500000;
//! end IEEE14_voltages;
//! ```

use crate::case::{BranchKey, Bus, Case, Load, LoadKey, Machine, MachineKey, Transformer};
use crate::error::{ConfigError, Result};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Kind {
    Voltages,
    Machines,
    Loads,
    Trafos,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Voltages, Kind::Machines, Kind::Loads, Kind::Trafos];

    /// Suffix of the file name, `<case>_<suffix>.mo`.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Kind::Voltages => "Voltages",
            Kind::Machines => "Machines",
            Kind::Loads => "Loads",
            Kind::Trafos => "Trafos",
        }
    }

    /// Suffix of the record name, `<case>_<suffix>`.
    pub fn record_suffix(&self) -> &'static str {
        match self {
            Kind::Voltages => "voltages",
            Kind::Machines => "machines",
            Kind::Loads => "loads",
            Kind::Trafos => "trafos",
        }
    }

    fn comment(&self) -> &'static str {
        match self {
            Kind::Voltages => "Bus number",
            Kind::Machines => "Machine",
            Kind::Loads => "Load",
            Kind::Trafos => "2WindingTrafo",
        }
    }

    /// Prefixes of the two parameter names of an entity.
    fn prefixes(&self) -> (&'static str, &'static str) {
        match self {
            Kind::Voltages => ("V", "A"),
            Kind::Machines => ("P", "Q"),
            Kind::Loads => ("PL", "QL"),
            Kind::Trafos => ("t1_", "t2_"),
        }
    }

    pub fn file_name(&self, case_name: &str) -> String {
        format!("{}_{}.mo", case_name, self.file_suffix())
    }

    pub fn record_name(&self, case_name: &str) -> String {
        format!("{}_{}", case_name, self.record_suffix())
    }
}

fn render<K: Display>(
    case_name: &str,
    kind: Kind,
    entries: impl Iterator<Item = (K, f64, f64)>,
) -> String {
    let name = kind.record_name(case_name);
    let (p1, p2) = kind.prefixes();

    let mut out = format!("record {}\n   extends Modelica.Icons.Record;\n", name);
    for (key, v1, v2) in entries {
        out.push_str(&format!("// {} {}\n", kind.comment(), key));
        out.push_str(&format!("   parameter Real {}{} = {:.6};\n", p1, key, v1));
        out.push_str(&format!("   parameter Real {}{} = {:.6};\n", p2, key, v2));
    }
    out.push_str(&format!("end {};\n", name));
    out
}

/// Bus voltage magnitudes `V<bus>` and angles `A<bus>`.
pub fn render_voltages(case_name: &str, buses: &BTreeMap<i32, Bus>) -> String {
    let entries = buses.iter().map(|(n, b)| (n, b.voltage, b.angle));
    render(case_name, Kind::Voltages, entries)
}

/// Machine active `P<key>` and reactive `Q<key>` power.
pub fn render_machines(case_name: &str, machines: &BTreeMap<MachineKey, Machine>) -> String {
    let entries = machines.iter().map(|(k, m)| (k, m.p, m.q));
    render(case_name, Kind::Machines, entries)
}

/// Load active `PL<key>` and reactive `QL<key>` power.
pub fn render_loads(case_name: &str, loads: &BTreeMap<LoadKey, Load>) -> String {
    let entries = loads.iter().map(|(k, l)| (k, l.p, l.q));
    render(case_name, Kind::Loads, entries)
}

/// Transformer primary `t1_<key>` and secondary `t2_<key>` ratios.
pub fn render_trafos(case_name: &str, trafos: &BTreeMap<BranchKey, Transformer>) -> String {
    let entries = trafos.iter().map(|(k, t)| (k, t.t1, t.t2));
    render(case_name, Kind::Trafos, entries)
}

/// Record writes the record files of one case into a directory.
pub struct Record<'a> {
    dir: PathBuf,
    case: &'a Case,
}

impl<'a> Record<'a> {
    pub fn new(dir: impl Into<PathBuf>, case: &'a Case) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ConfigError::MissingOutputDir(dir).into());
        }
        Ok(Self { dir, case })
    }

    /// Path of the file written for `kind`.
    pub fn path(&self, kind: Kind) -> PathBuf {
        self.dir.join(kind.file_name(&self.case.name))
    }

    pub fn render(&self, kind: Kind) -> String {
        let case = self.case;
        match kind {
            Kind::Voltages => render_voltages(&case.name, &case.buses),
            Kind::Machines => render_machines(&case.name, &case.machines),
            Kind::Loads => render_loads(&case.name, &case.loads),
            Kind::Trafos => render_trafos(&case.name, &case.transformers),
        }
    }

    pub fn write_voltages(&self) -> Result<()> {
        self.write(Kind::Voltages)
    }

    pub fn write_machines(&self) -> Result<()> {
        self.write(Kind::Machines)
    }

    pub fn write_loads(&self) -> Result<()> {
        self.write(Kind::Loads)
    }

    pub fn write_trafos(&self) -> Result<()> {
        self.write(Kind::Trafos)
    }

    /// Writes the four record files.
    pub fn write_all(&self) -> Result<()> {
        for kind in Kind::ALL {
            self.write(kind)?;
        }
        Ok(())
    }

    fn write(&self, kind: Kind) -> Result<()> {
        let path = self.path(kind);
        write_file(&path, &self.render(kind))?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

// Creates or truncates the file. The handle is closed when `w` drops.
fn write_file(path: &Path, text: &str) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(text.as_bytes())?;
    w.flush()
}
