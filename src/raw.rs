//! Reader for PSS/E RAW power flow case text (revision 33).
//!
//! Only the sections needed to answer engine queries are kept: buses,
//! loads, generators and two winding transformers. Fixed shunt and
//! non-transformer branch records are skipped, as are all sections after
//! the transformer data.

use num_complex::Complex64;
use std::collections::HashMap;
use thiserror::Error;

/// Bus type code of isolated (out-of-service) buses.
pub const ISOLATED: i32 = 4;

#[derive(Debug, Error, PartialEq)]
pub enum RawError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unexpected end of file in {0}")]
    Eof(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBus {
    pub number: i32,
    pub name: String,

    /// Base voltage (kV).
    pub base_kv: f64,

    /// Bus type code: 1 load, 2 generator, 3 swing, 4 isolated.
    pub ide: i32,

    pub area: i32,
    pub zone: i32,

    /// Voltage magnitude (p.u.).
    pub vm: f64,

    /// Voltage angle (degrees).
    pub va: f64,
}

impl RawBus {
    pub fn in_service(&self) -> bool {
        self.ide != ISOLATED
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawLoad {
    pub bus: i32,
    pub id: String,
    pub status: i32,

    /// Constant power load (MW, MVAr).
    pub pl: f64,
    pub ql: f64,

    /// Constant current load (MW, MVAr at 1 p.u.).
    pub ip: f64,
    pub iq: f64,

    /// Constant admittance load (MW, MVAr at 1 p.u.), `yq` negative for
    /// an inductive load.
    pub yp: f64,
    pub yq: f64,
}

impl RawLoad {
    /// Actual total demand at bus voltage magnitude `vm` (p.u.).
    pub fn total(&self, vm: f64) -> Complex64 {
        let vm2 = vm * vm;
        Complex64::new(
            self.pl + self.ip * vm + self.yp * vm2,
            self.ql + self.iq * vm - self.yq * vm2,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawMachine {
    pub bus: i32,
    pub id: String,

    /// Active power output (MW).
    pub pg: f64,

    /// Reactive power output (MVAr).
    pub qg: f64,

    pub status: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTransformer {
    pub from_bus: i32,
    pub to_bus: i32,
    pub ckt: String,

    /// Winding data I/O code.
    pub cw: i32,

    pub status: i32,

    /// Primary and secondary tap ratios in p.u. of the bus base voltages.
    pub ratio1: f64,
    pub ratio2: f64,
}

/// RawCase is the content of a RAW file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCase {
    /// Format revision from the case identification record, if given.
    pub revision: Option<i32>,

    /// System MVA base.
    pub base_mva: f64,

    /// The two title lines.
    pub title: Vec<String>,

    pub buses: Vec<RawBus>,
    pub loads: Vec<RawLoad>,
    pub machines: Vec<RawMachine>,
    pub transformers: Vec<RawTransformer>,
}

/// Splits a record into its fields.
///
/// Fields are separated by a comma or by blanks. Two consecutive commas
/// give an empty field. Quoted strings keep their commas and blanks, and
/// a `/` outside quotes starts a comment.
pub(crate) fn fields(record: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut started = false; // current field has content (or quotes)
    let mut blank_ended = false; // previous field was ended by blanks

    for c in record.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else {
                cur.push(c);
            }
            continue;
        }
        match c {
            '/' => break,
            '\'' | '"' => {
                quote = Some(c);
                started = true;
                blank_ended = false;
            }
            ',' => {
                if !blank_ended || started {
                    out.push(std::mem::take(&mut cur));
                }
                started = false;
                blank_ended = false;
            }
            c if c.is_whitespace() => {
                if started {
                    out.push(std::mem::take(&mut cur));
                    started = false;
                    blank_ended = true;
                }
            }
            c => {
                cur.push(c);
                started = true;
                blank_ended = false;
            }
        }
    }
    if started {
        out.push(cur);
    }
    out
}

struct Records<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
    finished: bool,
}

impl<'a> Records<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            line: 0,
            finished: false,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let (i, line) = self.lines.next()?;
        self.line = i + 1;
        Some(line)
    }

    /// Next non-blank record of a section, `None` at its terminator.
    fn next_record(&mut self) -> Option<Vec<String>> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.next_line() {
                Some(line) => line,
                None => {
                    self.finished = true;
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let f = fields(line);
            let first = f.first().map(|s| s.trim()).unwrap_or_default();
            if first == "Q" || first == "q" {
                self.finished = true;
                return None;
            }
            if first == "0" {
                return None;
            }
            return Some(f);
        }
    }

    /// Continuation line of a multi-line record.
    fn continuation(&mut self, section: &'static str) -> Result<Vec<String>, RawError> {
        match self.next_line() {
            Some(line) => Ok(fields(line)),
            None => Err(RawError::Eof(section)),
        }
    }

    fn skip_section(&mut self) {
        while self.next_record().is_some() {}
    }

    fn syntax(&self, message: String) -> RawError {
        RawError::Syntax {
            line: self.line,
            message,
        }
    }
}

struct Fields<'r, 'a> {
    f: &'r [String],
    records: &'r Records<'a>,
}

impl<'r, 'a> Fields<'r, 'a> {
    fn raw(&self, i: usize) -> Option<&'r str> {
        self.f.get(i).map(|s| s.as_str()).filter(|s| !s.trim().is_empty())
    }

    fn int(&self, i: usize, name: &str, default: i32) -> Result<i32, RawError> {
        match self.raw(i) {
            None => Ok(default),
            Some(s) => s
                .trim()
                .parse::<i32>()
                .map_err(|_| self.records.syntax(format!("invalid {}: {:?}", name, s))),
        }
    }

    fn required_int(&self, i: usize, name: &str) -> Result<i32, RawError> {
        match self.raw(i) {
            None => Err(self.records.syntax(format!("missing {}", name))),
            Some(_) => self.int(i, name, 0),
        }
    }

    fn real(&self, i: usize, name: &str, default: f64) -> Result<f64, RawError> {
        match self.raw(i) {
            None => Ok(default),
            Some(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.records.syntax(format!("invalid {}: {:?}", name, s))),
        }
    }

    fn text(&self, i: usize, default: &str) -> String {
        self.f
            .get(i)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    }
}

/// Parses RAW case text.
pub fn parse(text: &str) -> Result<RawCase, RawError> {
    let mut records = Records::new(text);

    let header = records
        .next_line()
        .ok_or(RawError::Eof("case identification data"))?;
    let header = fields(header);
    let (revision, base_mva) = {
        let f = Fields {
            f: &header,
            records: &records,
        };
        let revision = match f.raw(2) {
            Some(_) => Some(f.int(2, "REV", 0)?),
            None => None,
        };
        (revision, f.real(1, "SBASE", 100.0)?)
    };

    let mut title = Vec::with_capacity(2);
    for _ in 0..2 {
        let line = records
            .next_line()
            .ok_or(RawError::Eof("case identification data"))?;
        title.push(line.trim().to_string());
    }

    let mut case = RawCase {
        revision,
        base_mva,
        title,
        ..Default::default()
    };

    while let Some(f) = records.next_record() {
        let bus = parse_bus(&Fields {
            f: &f,
            records: &records,
        })?;
        case.buses.push(bus);
    }

    while let Some(f) = records.next_record() {
        let load = parse_load(&Fields {
            f: &f,
            records: &records,
        })?;
        case.loads.push(load);
    }

    // fixed shunt data
    records.skip_section();

    while let Some(f) = records.next_record() {
        let machine = parse_machine(&Fields {
            f: &f,
            records: &records,
        })?;
        case.machines.push(machine);
    }

    // non-transformer branch data
    records.skip_section();

    let base_kv: HashMap<i32, f64> = case.buses.iter().map(|b| (b.number, b.base_kv)).collect();
    while let Some(rec1) = records.next_record() {
        let f1 = Fields {
            f: &rec1,
            records: &records,
        };
        let k = f1.int(2, "K", 0)?;
        let n_lines = if k == 0 { 3 } else { 4 };
        let mut rest = Vec::with_capacity(n_lines);
        for _ in 0..n_lines {
            rest.push(records.continuation("transformer data")?);
        }
        if k != 0 {
            continue; // three winding
        }
        let f1 = Fields {
            f: &rec1,
            records: &records,
        };
        let f3 = Fields {
            f: &rest[1],
            records: &records,
        };
        let f4 = Fields {
            f: &rest[2],
            records: &records,
        };
        let trafo = parse_transformer(&f1, &f3, &f4, &base_kv)?;
        case.transformers.push(trafo);
    }

    Ok(case)
}

// I, 'NAME', BASKV, IDE, AREA, ZONE, OWNER, VM, VA, NVHI, NVLO, EVHI, EVLO
fn parse_bus(f: &Fields) -> Result<RawBus, RawError> {
    Ok(RawBus {
        number: f.required_int(0, "bus number")?,
        name: f.text(1, ""),
        base_kv: f.real(2, "BASKV", 0.0)?,
        ide: f.int(3, "IDE", 1)?,
        area: f.int(4, "AREA", 1)?,
        zone: f.int(5, "ZONE", 1)?,
        vm: f.real(7, "VM", 1.0)?,
        va: f.real(8, "VA", 0.0)?,
    })
}

// I, ID, STATUS, AREA, ZONE, PL, QL, IP, IQ, YP, YQ, OWNER, SCALE, INTRPT
fn parse_load(f: &Fields) -> Result<RawLoad, RawError> {
    Ok(RawLoad {
        bus: f.required_int(0, "load bus number")?,
        id: f.text(1, "1"),
        status: f.int(2, "STATUS", 1)?,
        pl: f.real(5, "PL", 0.0)?,
        ql: f.real(6, "QL", 0.0)?,
        ip: f.real(7, "IP", 0.0)?,
        iq: f.real(8, "IQ", 0.0)?,
        yp: f.real(9, "YP", 0.0)?,
        yq: f.real(10, "YQ", 0.0)?,
    })
}

// I, ID, PG, QG, QT, QB, VS, IREG, MBASE, ZR, ZX, RT, XT, GTAP, STAT, ...
fn parse_machine(f: &Fields) -> Result<RawMachine, RawError> {
    Ok(RawMachine {
        bus: f.required_int(0, "machine bus number")?,
        id: f.text(1, "1"),
        pg: f.real(2, "PG", 0.0)?,
        qg: f.real(3, "QG", 0.0)?,
        status: f.int(14, "STAT", 1)?,
    })
}

// Record 1: I, J, K, CKT, CW, CZ, CM, MAG1, MAG2, NMETR, 'NAME', STAT, ...
// Record 3: WINDV1, NOMV1, ANG1, ...
// Record 4: WINDV2, NOMV2
fn parse_transformer(
    f1: &Fields,
    f3: &Fields,
    f4: &Fields,
    base_kv: &HashMap<i32, f64>,
) -> Result<RawTransformer, RawError> {
    let from_bus = f1.required_int(0, "transformer from bus")?;
    let to_bus = f1.required_int(1, "transformer to bus")?;
    let cw = f1.int(4, "CW", 1)?;

    let kv1 = base_kv.get(&from_bus).copied().unwrap_or(0.0);
    let kv2 = base_kv.get(&to_bus).copied().unwrap_or(0.0);

    // Omitted winding voltages default to the bus base voltage.
    let default1 = if cw == 2 { kv1 } else { 1.0 };
    let default2 = if cw == 2 { kv2 } else { 1.0 };
    let windv1 = f3.real(0, "WINDV1", default1)?;
    let nomv1 = f3.real(1, "NOMV1", 0.0)?;
    let windv2 = f4.real(0, "WINDV2", default2)?;
    let nomv2 = f4.real(1, "NOMV2", 0.0)?;

    Ok(RawTransformer {
        from_bus,
        to_bus,
        ckt: f1.text(3, "1"),
        cw,
        status: f1.int(11, "STAT", 1)?,
        ratio1: tap_ratio(cw, windv1, nomv1, kv1),
        ratio2: tap_ratio(cw, windv2, nomv2, kv2),
    })
}

/// Converts a winding voltage to p.u. of the bus base voltage.
///
/// `cw` 1: already in p.u. of bus base; 2: in kV; 3: in p.u. of the
/// nominal winding voltage `nomv` (kV, zero meaning the bus base).
pub(crate) fn tap_ratio(cw: i32, windv: f64, nomv: f64, base_kv: f64) -> f64 {
    if base_kv <= 0.0 {
        if cw == 2 || (cw == 3 && nomv != 0.0) {
            log::warn!(
                "winding voltage {} (CW {}) at a bus without base voltage, used as ratio",
                windv,
                cw
            );
        }
        return windv;
    }
    match cw {
        2 => windv / base_kv,
        3 if nomv != 0.0 => windv * nomv / base_kv,
        _ => windv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::env;
    use std::path::Path;

    fn casedata(name: &str) -> Result<String> {
        let manifest_dir = env::var("CARGO_MANIFEST_DIR")?;
        let path = Path::new(&manifest_dir).join("casedata").join(name);
        Ok(std::fs::read_to_string(path)?)
    }

    #[test]
    fn test_fields() {
        assert_eq!(fields("1,'BUS 1, A', 132.0,3"), ["1", "BUS 1, A", "132.0", "3"]);
        assert_eq!(fields("  1   2 ,3,,4"), ["1", "2", "3", "", "4"]);
        assert_eq!(fields("0 / END OF BUS DATA, BEGIN LOAD DATA"), ["0"]);
        assert_eq!(fields("3,'1 ',1"), ["3", "1 ", "1"]);
        assert!(fields("   ").is_empty());
    }

    #[test]
    fn test_parse_case4() -> Result<()> {
        let case = parse(&casedata("case4.raw")?)?;

        assert_eq!(case.revision, Some(33));
        assert_eq!(case.base_mva, 100.0);
        assert_eq!(case.title.len(), 2);

        assert_eq!(case.buses.len(), 5);
        assert_eq!(case.buses[0].number, 1);
        assert_eq!(case.buses[0].name, "NORTH");
        assert_eq!(case.buses[0].vm, 1.02);
        assert_eq!(case.buses[0].va, -3.5);
        assert!(!case.buses[4].in_service());

        assert_eq!(case.loads.len(), 4);
        assert_eq!(case.machines.len(), 4);
        assert_eq!(case.machines[2].id, "G2");
        assert_eq!(case.machines[3].status, 0);

        // the three winding transformer is skipped
        assert_eq!(case.transformers.len(), 3);
        let t = &case.transformers[0];
        assert_eq!((t.from_bus, t.to_bus), (2, 3));
        assert_eq!(t.ratio1, 1.025);
        assert_eq!(t.ratio2, 1.0);
        Ok(())
    }

    #[test]
    fn test_parse_winding_codes() -> Result<()> {
        let case = parse(&casedata("case4.raw")?)?;

        // CW = 2: 138.6 kV on a 132 kV bus, 33 kV on a 33 kV bus
        let t = &case.transformers[1];
        assert_eq!(t.cw, 2);
        assert!((t.ratio1 - 1.05).abs() < 1e-12);
        assert!((t.ratio2 - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_parse_truncated_transformer() {
        let text = "0, 100.0, 33 /\nT1\nT2\n\
                    1,'A',132.0,3\n0 /\n0 /\n0 /\n0 /\n0 /\n\
                    1,2,0,'1 ',1,1,1,0,0,2,'X',1\n0.0,0.1,100.0\n";
        assert_eq!(parse(text), Err(RawError::Eof("transformer data")));
    }

    #[test]
    fn test_parse_invalid_number() {
        let text = "0, 100.0, 33 /\nT1\nT2\n1,'A',132.0,3,1,1,1,abc\n0 /\nQ\n";
        match parse(text) {
            Err(RawError::Syntax { line, message }) => {
                assert_eq!(line, 4);
                assert!(message.contains("VM"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_stops_at_q() -> Result<()> {
        let text = "0, 100.0 /\nT1\nT2\n1,'A',132.0,3\nQ\n";
        let case = parse(text)?;
        assert_eq!(case.revision, None);
        assert_eq!(case.buses.len(), 1);
        assert!(case.loads.is_empty());
        assert!(case.transformers.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_total() {
        let load = RawLoad {
            bus: 1,
            id: "1".to_string(),
            status: 1,
            pl: 10.0,
            ql: 5.0,
            ip: 2.0,
            iq: 1.0,
            yp: 4.0,
            yq: -2.0,
        };
        let s = load.total(0.5);
        assert_eq!(s.re, 10.0 + 1.0 + 1.0);
        assert_eq!(s.im, 5.0 + 0.5 + 0.5);
    }

    #[test]
    fn test_tap_ratio() {
        assert_eq!(tap_ratio(1, 1.05, 0.0, 132.0), 1.05);
        assert_eq!(tap_ratio(2, 66.0, 0.0, 132.0), 0.5);
        assert_eq!(tap_ratio(3, 1.0, 66.0, 132.0), 0.5);
        assert_eq!(tap_ratio(3, 1.1, 0.0, 132.0), 1.1);
    }

    #[test]
    fn test_tap_ratio_without_base_voltage() {
        // Nothing to convert against: the winding value is passed through.
        assert_eq!(tap_ratio(2, 66.0, 0.0, 0.0), 66.0);
        assert_eq!(tap_ratio(3, 1.0, 66.0, 0.0), 1.0);
        assert_eq!(tap_ratio(1, 1.05, 0.0, -1.0), 1.05);
    }
}
