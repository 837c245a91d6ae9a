use std::path::PathBuf;
use thiserror::Error;

/// Invalid paths or names supplied by the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("working directory does not exist: {0}")]
    MissingWorkdir(PathBuf),

    #[error("raw case path does not exist: {0}")]
    MissingRawPath(PathBuf),

    #[error("output directory does not exist: {0}")]
    MissingOutputDir(PathBuf),

    #[error("cannot derive a case name from: {0}")]
    CaseName(PathBuf),
}

/// Failures reported by the power flow engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("raw file cannot be opened: {path} (status {status})")]
    Open { path: PathBuf, status: i32 },

    #[error("error reading {step} (status {status})")]
    Status { step: &'static str, status: i32 },

    #[error("error reading {step}: expected {expected} values, got {actual}")]
    Length {
        step: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("no case has been opened")]
    NoCase,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
