use crate::case::{BranchKey, Bus, Case, Load, LoadKey, Machine, MachineKey, Transformer};
use crate::config::Config;
use crate::debug::{format_f64_vec, format_pq_vec};
use crate::engine::*;
use crate::error::{ConfigError, EngineError, Result};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Number of characters removed from a case file name to get the case name.
const EXTENSION_LEN: usize = 4;

/// Reader drives an engine session to load cases and extract their state.
pub struct Reader<E: Engine> {
    config: Config,
    engine: E,
    case_name: Option<String>,
    open: bool,
}

impl<E: Engine> Reader<E> {
    /// Checks the configured paths and initializes the engine session.
    pub fn new(config: Config, mut engine: E) -> Result<Self> {
        if !config.workdir.is_dir() {
            return Err(ConfigError::MissingWorkdir(config.workdir).into());
        }
        if !config.raw_path.exists() {
            return Err(ConfigError::MissingRawPath(config.raw_path).into());
        }

        let status = engine.init(config.bus_capacity);
        if status != 0 {
            return Err(EngineError::Status {
                step: "engine initialization",
                status,
            }
            .into());
        }

        Ok(Self {
            config,
            engine,
            case_name: None,
            open: true,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Name of the opened case.
    pub fn case_name(&self) -> Option<&str> {
        self.case_name.as_deref()
    }

    /// Lists the case files to process.
    ///
    /// A directory yields the files directly inside it whose name ends
    /// with the case extension, in directory order. A file path yields
    /// itself.
    pub fn list_raw_files(&self) -> Result<Vec<PathBuf>> {
        let raw_path = &self.config.raw_path;
        if !raw_path.is_dir() {
            return Ok(vec![raw_path.clone()]);
        }

        log::info!("{}", raw_path.display());
        let mut files = Vec::new();
        for entry in std::fs::read_dir(raw_path)? {
            let path = entry?.path();
            if path.is_file() && self.config.is_case_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Loads a case file into the engine.
    pub fn open_raw(&mut self, path: &Path) -> Result<()> {
        let name = case_name(path)?;

        let status = self.engine.read_raw(&self.config.version, path);
        if status != 0 {
            self.case_name = None;
            return Err(EngineError::Open {
                path: path.to_path_buf(),
                status,
            }
            .into());
        }

        log::info!("opened case {} from {}", name, path.display());
        self.case_name = Some(name);
        Ok(())
    }

    /// Extracts buses, machines, loads and two winding transformers of
    /// the opened case. The first failing query aborts the extraction.
    pub fn read_raw(&self) -> Result<Case> {
        let name = self.case_name.as_ref().ok_or(EngineError::NoCase)?;
        let mut case = Case::new(name.as_str());

        case.buses = self.read_buses()?;
        case.machines = self.read_machines()?;
        case.loads = self.read_loads()?;
        case.transformers = self.read_transformers()?;

        log::info!(
            "case {}: {} buses, {} machines, {} loads, {} transformers",
            case.name,
            case.buses.len(),
            case.machines.len(),
            case.loads.len(),
            case.transformers.len()
        );
        Ok(case)
    }

    /// Ends the engine session. Dropping the reader closes an open
    /// session as well, so early returns cannot leak it.
    pub fn close(&mut self) {
        if self.open {
            self.engine.close();
            self.open = false;
            self.case_name = None;
        }
    }

    fn read_buses(&self) -> Result<BTreeMap<i32, Bus>> {
        let sel = Selector::IN_SERVICE;
        let e = &self.engine;

        let numbers = e.bus_int(sel, BusInt::Number).check("bus numbers")?;
        let voltages = e.bus_real(sel, BusReal::Pu).check("voltage levels")?;
        let angles = e.bus_real(sel, BusReal::AngleD).check("voltage angles")?;

        same_len("voltage levels", numbers.len(), voltages.len())?;
        same_len("voltage angles", numbers.len(), angles.len())?;
        log::debug!("bus voltages: {}", format_f64_vec(&voltages));
        log::debug!("bus angles: {}", format_f64_vec(&angles));

        let mut buses = BTreeMap::new();
        for ((number, voltage), angle) in numbers.into_iter().zip(voltages).zip(angles) {
            let bus = Bus {
                number,
                voltage,
                angle,
            };
            insert_unique(&mut buses, number, bus, "bus");
        }
        Ok(buses)
    }

    fn read_machines(&self) -> Result<BTreeMap<MachineKey, Machine>> {
        let sel = Selector::IN_SERVICE;
        let e = &self.engine;

        let bus_numbers = e
            .mach_int(sel, MachInt::Number)
            .check("generator bus numbers")?;
        let ids = e.mach_char(sel, MachChar::Id).check("generator ids")?;
        same_len("generator ids", bus_numbers.len(), ids.len())?;

        let p = e.mach_real(sel, MachReal::PGen).check("generator active powers")?;
        let q = e.mach_real(sel, MachReal::QGen).check("generator reactive powers")?;
        same_len("generator active powers", bus_numbers.len(), p.len())?;
        same_len("generator reactive powers", bus_numbers.len(), q.len())?;
        log::debug!("machine P: {}", format_f64_vec(&p));
        log::debug!("machine Q: {}", format_f64_vec(&q));

        let mut machines = BTreeMap::new();
        for (((bus, id), p), q) in bus_numbers.into_iter().zip(ids).zip(p).zip(q) {
            let machine = Machine {
                bus,
                id: trim_id(&id).to_string(),
                p,
                q,
            };
            insert_unique(&mut machines, machine.key(), machine, "machine");
        }
        Ok(machines)
    }

    fn read_loads(&self) -> Result<BTreeMap<LoadKey, Load>> {
        let sel = Selector::IN_SERVICE;
        let e = &self.engine;

        let bus_numbers = e.load_int(sel, LoadInt::Number).check("load bus numbers")?;
        let ids = e.load_char(sel, LoadChar::Id).check("load ids")?;
        same_len("load ids", bus_numbers.len(), ids.len())?;

        let totals = e
            .load_cplx(sel, LoadCplx::TotalAct)
            .check("load active and reactive powers")?;
        same_len("load active and reactive powers", bus_numbers.len(), totals.len())?;
        log::debug!("load P, Q: {}", format_pq_vec(&totals));

        let mut loads = BTreeMap::new();
        for ((bus, id), s) in bus_numbers.into_iter().zip(ids).zip(totals) {
            let load = Load {
                bus,
                id: trim_id(&id).to_string(),
                p: s.re,
                q: s.im,
            };
            insert_unique(&mut loads, load.key(), load, "load");
        }
        Ok(loads)
    }

    fn read_transformers(&self) -> Result<BTreeMap<BranchKey, Transformer>> {
        let sel = Selector::IN_SERVICE;
        let e = &self.engine;

        let from = e
            .trn_int(sel, TrnInt::FromNumber)
            .check("transformer from bus numbers")?;
        let to = e
            .trn_int(sel, TrnInt::ToNumber)
            .check("transformer to bus numbers")?;
        same_len("transformer to bus numbers", from.len(), to.len())?;

        let ratio1 = e.trn_real(sel, TrnReal::Ratio).check("transformer ratios")?;
        let ratio2 = e
            .trn_real(sel, TrnReal::Ratio2)
            .check("transformer secondary ratios")?;
        same_len("transformer ratios", from.len(), ratio1.len())?;
        same_len("transformer secondary ratios", from.len(), ratio2.len())?;

        let mut transformers = BTreeMap::new();
        for (((from_bus, to_bus), t1), t2) in from.into_iter().zip(to).zip(ratio1).zip(ratio2) {
            let trafo = Transformer {
                from_bus,
                to_bus,
                t1,
                t2,
            };
            insert_unique(&mut transformers, trafo.key(), trafo, "transformer");
        }
        Ok(transformers)
    }
}

impl<E: Engine> Drop for Reader<E> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Case name of a case file: its file name without the last four
/// characters (the extension and its dot).
pub fn case_name(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ConfigError::CaseName(path.to_path_buf()))?;

    let n = file_name.chars().count();
    if n <= EXTENSION_LEN {
        return Err(ConfigError::CaseName(path.to_path_buf()).into());
    }
    Ok(file_name.chars().take(n - EXTENSION_LEN).collect())
}

fn same_len(step: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(EngineError::Length {
            step,
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}

// Later entries replace earlier ones with the same key.
fn insert_unique<K: Ord + Display, V>(map: &mut BTreeMap<K, V>, key: K, value: V, kind: &str) {
    if map.contains_key(&key) {
        log::warn!("duplicate {} {}, keeping the last one", kind, key);
    }
    map.insert(key, value);
}
