use derive_builder::Builder;
use std::path::{Path, PathBuf};

/// RAW format revision requested from the engine.
pub const DEFAULT_VERSION: &str = "33.0";

/// Case files are matched by this file name suffix.
pub const DEFAULT_EXTENSION: &str = "raw";

/// Bus capacity the engine session is initialized with.
pub const DEFAULT_BUS_CAPACITY: usize = 100;

/// Inputs of an extraction run.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(setter(into))]
pub struct Config {
    /// Existing directory the record files are written to.
    pub workdir: PathBuf,

    /// A single case file or a directory holding case files.
    pub raw_path: PathBuf,

    #[builder(default = "String::from(DEFAULT_VERSION)")]
    pub version: String,

    /// Case file extension, without the leading dot.
    #[builder(default = "String::from(DEFAULT_EXTENSION)")]
    pub extension: String,

    #[builder(default = "DEFAULT_BUS_CAPACITY")]
    pub bus_capacity: usize,
}

impl Config {
    pub fn new(workdir: impl Into<PathBuf>, raw_path: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            raw_path: raw_path.into(),
            version: DEFAULT_VERSION.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Suffix match on the file name, e.g. `case.raw` for extension `raw`.
    pub(crate) fn is_case_file(&self, path: &Path) -> bool {
        let suffix = format!(".{}", self.extension);
        path.file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.ends_with(&suffix))
    }
}
