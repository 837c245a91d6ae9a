mod case;
mod config;
mod engine;
mod error;
mod reader;
mod record;

pub mod debug;
pub mod raw;
pub mod session;

pub use case::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use reader::*;
pub use record::*;
pub use session::RawSession;
