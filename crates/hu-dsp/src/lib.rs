//! hu-dsp: DSP stages for the head-unit engine
//!
//! Block-oriented processing with explicit pass-through on numeric faults.
//!
//! ## Modules
//! - `bands` - 31-band ISO table, gain set, band-to-bin mapping
//! - `eq` - FFT-domain graphic equalizer
//! - `dynamics` - Static compressor, hard limiter, envelope compressor
//! - `bass` - Bass enhancer (reference scaling or low shelf)
//! - `biquad` - TDF-II biquad filters
//! - `delay` - Integer-sample delay line
//! - `analysis` - Hann-windowed spectrum and band levels
//! - `metering` - RMS/peak measurement with bounded history

pub mod bands;
pub mod eq;
pub mod dynamics;
pub mod bass;
pub mod biquad;
pub mod delay;
pub mod analysis;
pub mod metering;
mod outcome;

pub use outcome::{DspFault, StageOutcome};

use hu_core::Sample;

/// Transform length used by the equalizer and the analyzer
pub const FFT_SIZE: usize = 512;

/// One-sided spectrum length kept for display
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;

/// Capacity of the RMS and peak histories
pub const HISTORY_CAPACITY: usize = 100;

/// Trait for stateful DSP processors
pub trait Processor: Send + Sync {
    /// Reset processor state
    fn reset(&mut self);
}

/// Mono processor trait
pub trait MonoProcessor: Processor {
    /// Process a single sample
    fn process_sample(&mut self, input: Sample) -> Sample;

    /// Process a block of samples
    fn process_block(&mut self, buffer: &mut [Sample]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Processor configuration for sample rate changes
pub trait ProcessorConfig {
    fn set_sample_rate(&mut self, sample_rate: f64);
}
