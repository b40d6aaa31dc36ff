//! RMS and peak level measurement with bounded histories

use std::collections::VecDeque;

use hu_core::{Block, Sample};
use serde::Serialize;

use crate::{DspFault, StageOutcome, HISTORY_CAPACITY};

/// Levels of one block
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Levels {
    pub rms: f64,
    pub peak: f64,
}

/// RMS and absolute peak of `samples`; an empty slice measures as zero.
pub fn measure(samples: &[Sample]) -> Levels {
    if samples.is_empty() {
        return Levels::default();
    }
    let (sum_sq, peak) = samples
        .iter()
        .fold((0.0, 0.0_f64), |(sum, peak), &s| (sum + s * s, peak.max(s.abs())));
    Levels {
        rms: (sum_sq / samples.len() as f64).sqrt(),
        peak,
    }
}

/// Fixed-capacity FIFO of level readings
#[derive(Debug, Clone)]
pub struct LevelHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl LevelHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest reading once full.
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for LevelHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

/// Block meter that records every reading into RMS and peak histories
#[derive(Debug, Clone, Default)]
pub struct LevelMeter {
    current: Levels,
    rms_history: LevelHistory,
    peak_history: LevelHistory,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure `block` and append to both histories.
    ///
    /// A block holding NaN/Inf is rejected and nothing is recorded.
    pub fn measure(&mut self, block: &Block) -> Result<Levels, DspFault> {
        StageOutcome::check_finite(block)?;
        let levels = measure(block.samples());
        self.current = levels;
        self.rms_history.push(levels.rms);
        self.peak_history.push(levels.peak);
        Ok(levels)
    }

    pub fn current(&self) -> Levels {
        self.current
    }

    pub fn rms_history(&self) -> &LevelHistory {
        &self.rms_history
    }

    pub fn peak_history(&self) -> &LevelHistory {
        &self.peak_history
    }

    pub fn reset(&mut self) {
        self.current = Levels::default();
        self.rms_history.clear();
        self.peak_history.clear();
    }
}
