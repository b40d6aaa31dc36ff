//! hu-state: Persisted configuration and EQ curve presets
//!
//! The configuration file is a lenient JSON record: whatever fields are
//! present and well-typed are applied, everything else is ignored.

mod config;
mod preset;

pub use config::*;
pub use preset::*;
