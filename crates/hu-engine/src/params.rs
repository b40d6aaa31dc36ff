//! Engine parameter record
//!
//! Cloned once per block so a whole `process()` call sees one consistent set.

use hu_core::{
    BASS_GAIN_RANGE, CEILING_RANGE, ChannelBank, ParamRange, RATIO_RANGE, THRESHOLD_RANGE,
};
use hu_dsp::bands::EqGains;
use hu_dsp::bass::BassMode;
use hu_dsp::dynamics::{DEFAULT_ATTACK_MS, DEFAULT_RELEASE_MS};
use serde::{Deserialize, Serialize};

/// Envelope compressor attack (ms)
pub const ATTACK_RANGE: ParamRange = ParamRange::new(0.1, 100.0, DEFAULT_ATTACK_MS);
/// Envelope compressor release (ms)
pub const RELEASE_RANGE: ParamRange = ParamRange::new(10.0, 2000.0, DEFAULT_RELEASE_MS);

/// Which compressor runs when compression is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressorMode {
    /// Memoryless curve on `|x|`
    #[default]
    Static,
    /// Same curve on an attack/release envelope
    Envelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DynamicsSettings {
    pub compressor_enabled: bool,
    pub limiter_enabled: bool,
    pub threshold: f64,
    pub ratio: f64,
    pub ceiling: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
    pub mode: CompressorMode,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self {
            compressor_enabled: false,
            limiter_enabled: false,
            threshold: THRESHOLD_RANGE.default,
            ratio: RATIO_RANGE.default,
            ceiling: CEILING_RANGE.default,
            attack_ms: ATTACK_RANGE.default,
            release_ms: RELEASE_RANGE.default,
            mode: CompressorMode::Static,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BassSettings {
    /// 0 dB disables the stage
    pub gain_db: f64,
    pub mode: BassMode,
}

impl Default for BassSettings {
    fn default() -> Self {
        Self {
            gain_db: BASS_GAIN_RANGE.default,
            mode: BassMode::Reference,
        }
    }
}

/// Everything a `process()` call reads
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineParams {
    pub eq: EqGains,
    pub channels: ChannelBank,
    pub dynamics: DynamicsSettings,
    pub bass: BassSettings,
}
