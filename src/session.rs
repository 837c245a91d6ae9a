use crate::engine::*;
use crate::raw::{self, RawBus, RawCase};
use num_complex::Complex64;
use std::collections::HashMap;
use std::path::Path;

pub const OK: i32 = 0;
/// The case file cannot be read.
pub const NOT_READABLE: i32 = 1;
/// The case file is not valid RAW text.
pub const PARSE_ERROR: i32 = 2;
/// The requested format version is not supported.
pub const BAD_VERSION: i32 = 3;
/// The session is not initialized or holds no case.
pub const NO_CASE: i32 = 4;
/// Only the whole-case subsystem (`sid = -1`) is supported.
pub const BAD_SUBSYSTEM: i32 = 5;

const REVISION: i32 = 33;

struct Loaded {
    case: RawCase,
    // bus number -> index into case.buses
    bus_index: HashMap<i32, usize>,
}

impl Loaded {
    fn new(case: RawCase) -> Self {
        let bus_index = case
            .buses
            .iter()
            .enumerate()
            .map(|(i, b)| (b.number, i))
            .collect();
        Self { case, bus_index }
    }

    fn bus(&self, number: i32) -> Option<&RawBus> {
        self.bus_index.get(&number).map(|&i| &self.case.buses[i])
    }

    fn bus_in_service(&self, number: i32) -> bool {
        self.bus(number).map_or(false, |b| b.in_service())
    }
}

/// RawSession is an in-process [`Engine`] that answers queries from the
/// solved state stored in a RAW file.
#[derive(Default)]
pub struct RawSession {
    initialized: bool,
    bus_capacity: usize,
    loaded: Option<Loaded>,
}

impl RawSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn query<T>(&self, sel: Selector, f: impl FnOnce(&Loaded) -> Vec<T>) -> Reply<T> {
        if sel.sid != -1 {
            return Reply::err(BAD_SUBSYSTEM);
        }
        match self.loaded.as_ref() {
            Some(loaded) if self.initialized => Reply::ok(f(loaded)),
            _ => Reply::err(NO_CASE),
        }
    }

    fn buses<'a>(loaded: &'a Loaded, sel: Selector) -> impl Iterator<Item = &'a RawBus> {
        loaded
            .case
            .buses
            .iter()
            .filter(move |b| sel.selects(b.in_service()))
    }

    fn machines<'a>(
        loaded: &'a Loaded,
        sel: Selector,
    ) -> impl Iterator<Item = &'a raw::RawMachine> {
        loaded
            .case
            .machines
            .iter()
            .filter(move |m| sel.selects(m.status == 1 && loaded.bus_in_service(m.bus)))
    }

    fn loads<'a>(loaded: &'a Loaded, sel: Selector) -> impl Iterator<Item = &'a raw::RawLoad> {
        loaded
            .case
            .loads
            .iter()
            .filter(move |l| sel.selects(l.status == 1 && loaded.bus_in_service(l.bus)))
    }

    fn transformers<'a>(
        loaded: &'a Loaded,
        sel: Selector,
    ) -> impl Iterator<Item = &'a raw::RawTransformer> {
        loaded.case.transformers.iter().filter(move |t| {
            sel.selects(
                t.status == 1
                    && loaded.bus_in_service(t.from_bus)
                    && loaded.bus_in_service(t.to_bus),
            )
        })
    }
}

fn pad_id(id: &str) -> String {
    format!("{:<width$}", id, width = ID_WIDTH)
}

fn supported_version(version: &str) -> bool {
    version
        .trim()
        .parse::<f64>()
        .map_or(false, |v| v == REVISION as f64)
}

impl Engine for RawSession {
    fn init(&mut self, bus_capacity: usize) -> i32 {
        self.initialized = true;
        self.bus_capacity = bus_capacity;
        self.loaded = None;
        OK
    }

    fn read_raw(&mut self, version: &str, path: &Path) -> i32 {
        if !self.initialized {
            return NO_CASE;
        }
        if !supported_version(version) {
            log::error!("unsupported RAW version: {}", version);
            return BAD_VERSION;
        }
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("{}: {}", path.display(), err);
                return NOT_READABLE;
            }
        };
        // RAW files are written in the system code page. Non-ASCII bytes
        // only occur in names, which are never queried.
        let text = String::from_utf8_lossy(&bytes);
        let case = match raw::parse(&text) {
            Ok(case) => case,
            Err(err) => {
                log::error!("{}: {}", path.display(), err);
                return PARSE_ERROR;
            }
        };
        if let Some(rev) = case.revision {
            if rev != REVISION {
                log::warn!(
                    "{}: revision {} read as revision {}",
                    path.display(),
                    rev,
                    REVISION
                );
            }
        }
        if case.buses.len() > self.bus_capacity {
            log::debug!(
                "case has {} buses, session sized for {}",
                case.buses.len(),
                self.bus_capacity
            );
        }
        self.loaded = Some(Loaded::new(case));
        OK
    }

    fn close(&mut self) {
        self.loaded = None;
        self.initialized = false;
    }

    fn bus_int(&self, sel: Selector, attr: BusInt) -> Reply<i32> {
        self.query(sel, |loaded| match attr {
            BusInt::Number => Self::buses(loaded, sel).map(|b| b.number).collect(),
        })
    }

    fn bus_real(&self, sel: Selector, attr: BusReal) -> Reply<f64> {
        self.query(sel, |loaded| {
            Self::buses(loaded, sel)
                .map(|b| match attr {
                    BusReal::Pu => b.vm,
                    BusReal::AngleD => b.va,
                })
                .collect()
        })
    }

    fn mach_int(&self, sel: Selector, attr: MachInt) -> Reply<i32> {
        self.query(sel, |loaded| match attr {
            MachInt::Number => Self::machines(loaded, sel).map(|m| m.bus).collect(),
        })
    }

    fn mach_char(&self, sel: Selector, attr: MachChar) -> Reply<String> {
        self.query(sel, |loaded| match attr {
            MachChar::Id => Self::machines(loaded, sel).map(|m| pad_id(&m.id)).collect(),
        })
    }

    fn mach_real(&self, sel: Selector, attr: MachReal) -> Reply<f64> {
        self.query(sel, |loaded| {
            Self::machines(loaded, sel)
                .map(|m| match attr {
                    MachReal::PGen => m.pg,
                    MachReal::QGen => m.qg,
                })
                .collect()
        })
    }

    fn load_int(&self, sel: Selector, attr: LoadInt) -> Reply<i32> {
        self.query(sel, |loaded| match attr {
            LoadInt::Number => Self::loads(loaded, sel).map(|l| l.bus).collect(),
        })
    }

    fn load_char(&self, sel: Selector, attr: LoadChar) -> Reply<String> {
        self.query(sel, |loaded| match attr {
            LoadChar::Id => Self::loads(loaded, sel).map(|l| pad_id(&l.id)).collect(),
        })
    }

    fn load_cplx(&self, sel: Selector, attr: LoadCplx) -> Reply<Complex64> {
        self.query(sel, |loaded| match attr {
            LoadCplx::TotalAct => Self::loads(loaded, sel)
                .map(|l| {
                    let vm = loaded.bus(l.bus).map_or(1.0, |b| b.vm);
                    l.total(vm)
                })
                .collect(),
        })
    }

    fn trn_int(&self, sel: Selector, attr: TrnInt) -> Reply<i32> {
        self.query(sel, |loaded| {
            Self::transformers(loaded, sel)
                .map(|t| match attr {
                    TrnInt::FromNumber => t.from_bus,
                    TrnInt::ToNumber => t.to_bus,
                })
                .collect()
        })
    }

    fn trn_real(&self, sel: Selector, attr: TrnReal) -> Reply<f64> {
        self.query(sel, |loaded| {
            Self::transformers(loaded, sel)
                .map(|t| match attr {
                    TrnReal::Ratio => t.ratio1,
                    TrnReal::Ratio2 => t.ratio2,
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::env;
    use std::path::PathBuf;

    fn case4() -> Result<PathBuf> {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR")?;
        Ok(Path::new(&manifest_dir).join("casedata").join("case4.raw"))
    }

    fn session() -> Result<RawSession> {
        let mut s = RawSession::new();
        assert_eq!(s.init(100), OK);
        assert_eq!(s.read_raw("33.0", &case4()?), OK);
        Ok(s)
    }

    #[test]
    fn test_in_service_buses() -> Result<()> {
        let s = session()?;
        let sel = Selector::IN_SERVICE;
        assert_eq!(s.bus_int(sel, BusInt::Number).values, [1, 2, 3, 4]);
        assert_eq!(
            s.bus_real(sel, BusReal::Pu).values,
            [1.02, 1.01, 0.98, 0.995]
        );

        let all = Selector {
            sid: -1,
            flag: Flag::All,
        };
        assert_eq!(s.bus_int(all, BusInt::Number).values.len(), 5);
        Ok(())
    }

    #[test]
    fn test_ids_are_padded() -> Result<()> {
        let s = session()?;
        let ids = s.mach_char(Selector::IN_SERVICE, MachChar::Id).check("ids")?;
        assert_eq!(ids, ["1 ", "1 ", "G2"]);
        Ok(())
    }

    #[test]
    fn test_load_totals() -> Result<()> {
        let s = session()?;
        let loads = s
            .load_cplx(Selector::IN_SERVICE, LoadCplx::TotalAct)
            .check("loads")?;
        assert_eq!(loads.len(), 2);
        assert_eq!(loads[0], Complex64::new(40.0, 10.0));
        assert!((loads[1].re - 22.980025).abs() < 1e-9);
        assert!((loads[1].im - 6.4900125).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_transformers() -> Result<()> {
        let s = session()?;
        let sel = Selector::IN_SERVICE;
        assert_eq!(s.trn_int(sel, TrnInt::FromNumber).values, [2, 1]);
        assert_eq!(s.trn_int(sel, TrnInt::ToNumber).values, [3, 4]);
        assert_eq!(s.trn_real(sel, TrnReal::Ratio).values.len(), 2);
        Ok(())
    }

    #[test]
    fn test_status_codes() -> Result<()> {
        let mut s = RawSession::new();
        assert_eq!(s.read_raw("33.0", &case4()?), NO_CASE);
        assert_eq!(s.bus_int(Selector::IN_SERVICE, BusInt::Number).status, NO_CASE);

        s.init(100);
        assert_eq!(s.read_raw("31", &case4()?), BAD_VERSION);
        assert_eq!(s.read_raw("33", Path::new("missing.raw")), NOT_READABLE);
        assert_eq!(s.bus_int(Selector::IN_SERVICE, BusInt::Number).status, NO_CASE);

        assert_eq!(s.read_raw("33", &case4()?), OK);
        let sel = Selector {
            sid: 2,
            flag: Flag::InService,
        };
        assert_eq!(s.bus_int(sel, BusInt::Number).status, BAD_SUBSYSTEM);

        s.close();
        assert_eq!(s.bus_int(Selector::IN_SERVICE, BusInt::Number).status, NO_CASE);
        Ok(())
    }

    #[test]
    fn test_latin1_bus_name() -> Result<()> {
        let mut bytes = std::fs::read(case4()?)?;
        let pos = bytes
            .windows(5)
            .position(|w| w == b"NORTH")
            .ok_or_else(|| anyhow::format_err!("bus NORTH not found"))?;
        bytes[pos + 1] = 0xD8; // 'Ø' in Latin-1
        assert!(std::str::from_utf8(&bytes).is_err());

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nordic.raw");
        std::fs::write(&path, &bytes)?;

        let mut s = RawSession::new();
        s.init(100);
        assert_eq!(s.read_raw("33.0", &path), OK);
        assert_eq!(
            s.bus_int(Selector::IN_SERVICE, BusInt::Number).values,
            [1, 2, 3, 4]
        );
        Ok(())
    }

    #[test]
    fn test_parse_error_status() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bad.raw");
        std::fs::write(&path, "0, 100.0, 33\nT1\nT2\nx,'A'\n")?;

        let mut s = RawSession::new();
        s.init(100);
        assert_eq!(s.read_raw("33.0", &path), PARSE_ERROR);
        Ok(())
    }
}
