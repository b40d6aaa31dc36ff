//! Bass enhancement applied after dynamics
//!
//! The reference mode is a flat broadband gain derived from the boost amount.
//! The low-shelf mode boosts only below [`SHELF_FREQ_HZ`] and keeps filter
//! state across blocks.

use hu_core::{Block, Decibels};
use serde::{Deserialize, Serialize};

use crate::biquad::{BiquadTDF2, BUTTERWORTH_Q};
use crate::{DspFault, MonoProcessor, Processor, ProcessorConfig, StageOutcome};

/// Corner of the low-shelf mode
pub const SHELF_FREQ_HZ: f64 = 100.0;

/// How the boost amount is turned into gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BassMode {
    /// Broadband `1 + 0.1 * 10^(dB/20)` scaling
    #[default]
    Reference,
    /// RBJ low shelf at 100 Hz
    LowShelf,
}

/// Broadband reference boost; `gain_db <= 0` leaves the block unchanged.
pub fn boost(block: &Block, gain_db: f64) -> StageOutcome {
    if !gain_db.is_finite() {
        return StageOutcome::pass_through(
            block,
            DspFault::InvalidParameter {
                name: "bass gain",
                value: gain_db,
            },
        );
    }
    if gain_db <= 0.0 {
        return StageOutcome::Processed(block.clone());
    }
    if let Err(fault) = StageOutcome::check_finite(block) {
        return StageOutcome::pass_through(block, fault);
    }

    let factor = 1.0 + 0.1 * Decibels(gain_db).to_gain();
    StageOutcome::Processed(block.map(|x| x * factor))
}

/// Bass stage with selectable mode
#[derive(Debug, Clone)]
pub struct BassEnhancer {
    mode: BassMode,
    shelf: BiquadTDF2,
    shelf_gain_db: f64,
}

impl BassEnhancer {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            mode: BassMode::Reference,
            shelf: BiquadTDF2::new(sample_rate),
            shelf_gain_db: 0.0,
        }
    }

    pub fn mode(&self) -> BassMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BassMode) {
        if mode != self.mode {
            self.mode = mode;
            self.shelf.reset();
        }
    }

    pub fn process(&mut self, block: &Block, gain_db: f64) -> StageOutcome {
        match self.mode {
            BassMode::Reference => boost(block, gain_db),
            BassMode::LowShelf => self.process_shelf(block, gain_db),
        }
    }

    fn process_shelf(&mut self, block: &Block, gain_db: f64) -> StageOutcome {
        if !gain_db.is_finite() {
            return StageOutcome::pass_through(
                block,
                DspFault::InvalidParameter {
                    name: "bass gain",
                    value: gain_db,
                },
            );
        }
        if gain_db <= 0.0 {
            return StageOutcome::Processed(block.clone());
        }
        if let Err(fault) = StageOutcome::check_finite(block) {
            return StageOutcome::pass_through(block, fault);
        }

        if gain_db != self.shelf_gain_db {
            self.shelf_gain_db = gain_db;
            self.shelf.set_low_shelf(SHELF_FREQ_HZ, BUTTERWORTH_Q, gain_db);
        }

        let mut samples = block.samples().to_vec();
        self.shelf.process_block(&mut samples);
        StageOutcome::Processed(block.with_samples(samples))
    }
}

impl Processor for BassEnhancer {
    fn reset(&mut self) {
        self.shelf.reset();
    }
}

impl ProcessorConfig for BassEnhancer {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.shelf.set_sample_rate(sample_rate);
        if self.shelf_gain_db > 0.0 {
            self.shelf
                .set_low_shelf(SHELF_FREQ_HZ, BUTTERWORTH_Q, self.shelf_gain_db);
        }
        self.shelf.reset();
    }
}
