//! Query interface of the power flow engine.
//!
//! Every query addresses one element category (buses, machines, loads or
//! two winding transformers) and one named attribute, and returns a
//! [`Reply`] holding a status code and one value per selected element.
//! Values of the different attributes of a category come back in the same
//! element order, so they can be zipped positionally.

use crate::error::EngineError;
use num_complex::Complex64;
use std::path::Path;

/// Width of machine and load identifiers returned by the engine. Shorter
/// identifiers are right padded with blanks.
pub const ID_WIDTH: usize = 2;

/// Strips the blank padding from a fixed width engine identifier.
///
/// Only trailing blanks are removed. This deliberately differs from the
/// legacy rule of slicing off the last character, which turned a full
/// width id such as `G2` into `G`.
///
/// ```
/// assert_eq!(rawrecords::trim_id("1 "), "1");
/// assert_eq!(rawrecords::trim_id("G1"), "G1");
/// assert_eq!(rawrecords::trim_id("G2"), "G2");
/// ```
pub fn trim_id(id: &str) -> &str {
    id.trim_end_matches(' ')
}

/// Reply is the status and value list returned by an engine query.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    /// Zero on success.
    pub status: i32,
    pub values: Vec<T>,
}

impl<T> Reply<T> {
    pub fn ok(values: Vec<T>) -> Self {
        Self { status: 0, values }
    }

    pub fn err(status: i32) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }

    /// Returns the values, or the status as an error naming `step`.
    pub fn check(self, step: &'static str) -> Result<Vec<T>, EngineError> {
        if self.status != 0 {
            return Err(EngineError::Status {
                step,
                status: self.status,
            });
        }
        Ok(self.values)
    }
}

/// Element status filter.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Flag {
    /// Only in-service elements.
    InService,
    /// All elements, including out-of-service ones.
    All,
}

/// Selector addresses the elements a query applies to.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Selector {
    /// Subsystem id, `-1` for the whole case.
    pub sid: i32,
    pub flag: Flag,
}

impl Selector {
    /// In-service elements of the whole case.
    pub const IN_SERVICE: Selector = Selector {
        sid: -1,
        flag: Flag::InService,
    };

    /// Whether an element with the given status is selected.
    pub fn selects(&self, in_service: bool) -> bool {
        match self.flag {
            Flag::InService => in_service,
            Flag::All => true,
        }
    }
}

macro_rules! attributes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Copy, Clone)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Attribute name as understood by the engine.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }
    };
}

attributes!(
    /// Integer bus attributes.
    BusInt { Number => "NUMBER" }
);
attributes!(
    /// Real bus attributes.
    BusReal { Pu => "PU", AngleD => "ANGLED" }
);
attributes!(MachInt { Number => "NUMBER" });
attributes!(MachChar { Id => "ID" });
attributes!(
    /// Real machine attributes (MW, MVAr).
    MachReal { PGen => "PGEN", QGen => "QGEN" }
);
attributes!(LoadInt { Number => "NUMBER" });
attributes!(LoadChar { Id => "ID" });
attributes!(
    /// Complex load attributes (MW + j MVAr).
    LoadCplx { TotalAct => "TOTALACT" }
);
attributes!(
    /// Integer two winding transformer attributes.
    TrnInt { FromNumber => "FROMNUMBER", ToNumber => "TONUMBER" }
);
attributes!(
    /// Real two winding transformer attributes. Ratios are in p.u. of the
    /// bus base voltage on each side.
    TrnReal { Ratio => "RATIO", Ratio2 => "RATIO2" }
);

/// Engine is a power flow engine session holding at most one loaded case.
pub trait Engine {
    /// Starts the session, sized for `bus_capacity` buses.
    fn init(&mut self, bus_capacity: usize) -> i32;

    /// Loads the case file at `path`, replacing any loaded case.
    fn read_raw(&mut self, version: &str, path: &Path) -> i32;

    /// Ends the session and drops the loaded case.
    fn close(&mut self);

    fn bus_int(&self, sel: Selector, attr: BusInt) -> Reply<i32>;
    fn bus_real(&self, sel: Selector, attr: BusReal) -> Reply<f64>;

    fn mach_int(&self, sel: Selector, attr: MachInt) -> Reply<i32>;
    fn mach_char(&self, sel: Selector, attr: MachChar) -> Reply<String>;
    fn mach_real(&self, sel: Selector, attr: MachReal) -> Reply<f64>;

    fn load_int(&self, sel: Selector, attr: LoadInt) -> Reply<i32>;
    fn load_char(&self, sel: Selector, attr: LoadChar) -> Reply<String>;
    fn load_cplx(&self, sel: Selector, attr: LoadCplx) -> Reply<Complex64>;

    fn trn_int(&self, sel: Selector, attr: TrnInt) -> Reply<i32>;
    fn trn_real(&self, sel: Selector, attr: TrnReal) -> Reply<f64>;
}
