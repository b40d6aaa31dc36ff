//! hu-core: Shared types for the head-unit DSP engine
//!
//! This crate provides the foundational types used across all head-unit crates:
//! sample blocks, decibel conversion, the closed channel model and errors.

mod sample;
mod params;
mod error;
mod channel;

pub use sample::*;
pub use params::*;
pub use error::*;
pub use channel::*;

/// Sample rate used when none is configured
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
