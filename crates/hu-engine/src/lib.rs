//! hu-engine: Head-unit DSP engine
//!
//! Provides:
//! - `DspEngine` owned by the processing thread (stage instances, strips)
//! - `EngineHandle` shared with control and display threads
//! - Parameter snapshots taken once per block
//! - Telemetry published wholesale after each block
//! - Control command decoding

mod command;
mod engine;
mod params;
mod strip;
mod telemetry;

pub use command::*;
pub use engine::*;
pub use params::*;
pub use strip::*;
pub use telemetry::*;
