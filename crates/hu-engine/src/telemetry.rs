//! Telemetry published by the processing thread

use hu_dsp::analysis::AnalysisSnapshot;
use hu_dsp::metering::Levels;
use serde::Serialize;

/// Display data from the most recent processed block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Telemetry {
    pub analysis: AnalysisSnapshot,
    pub levels: Levels,
    /// Oldest first, at most 100 entries
    pub rms_history: Vec<f64>,
    pub peak_history: Vec<f64>,
}

/// Service counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStatus {
    pub active: bool,
    pub blocks_processed: u64,
    pub samples_processed: u64,
    pub faults: u64,
    pub sample_rate: u32,
    pub uptime_secs: f64,
}
