//! Dynamics: static compressor, hard limiter, envelope compressor
//!
//! `compress` and `limit` are memoryless: each output sample depends only on
//! the matching input sample. [`EnvelopeCompressor`] is the stateful variant
//! that follows the signal with attack/release smoothing.

use hu_core::{Block, CEILING_RANGE, Sample};

use crate::{DspFault, Processor, ProcessorConfig, StageOutcome};

/// Default compressor attack in milliseconds
pub const DEFAULT_ATTACK_MS: f64 = 3.0;
/// Default compressor release in milliseconds
pub const DEFAULT_RELEASE_MS: f64 = 100.0;

/// Reduce magnitudes above `threshold` by `ratio`, keeping the sign.
///
/// `|y| = threshold + (|x| - threshold) / ratio` above the threshold,
/// `y = x` at or below it.
pub fn compress(block: &Block, threshold: f64, ratio: f64) -> StageOutcome {
    if let Err(fault) = check_compressor_params(threshold, ratio) {
        return StageOutcome::pass_through(block, fault);
    }
    if let Err(fault) = StageOutcome::check_finite(block) {
        return StageOutcome::pass_through(block, fault);
    }

    StageOutcome::Processed(block.map(|x| compress_sample(x, threshold, ratio)))
}

#[inline(always)]
fn compress_sample(x: Sample, threshold: f64, ratio: f64) -> Sample {
    let envelope = x.abs();
    if envelope > threshold {
        (threshold + (envelope - threshold) / ratio).copysign(x)
    } else {
        x
    }
}

fn check_compressor_params(threshold: f64, ratio: f64) -> Result<(), DspFault> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(DspFault::InvalidParameter {
            name: "threshold",
            value: threshold,
        });
    }
    if !ratio.is_finite() || ratio < 1.0 {
        return Err(DspFault::InvalidParameter {
            name: "ratio",
            value: ratio,
        });
    }
    Ok(())
}

/// Hard clip every sample into `[-ceiling, ceiling]`.
///
/// The ceiling must lie in `[0, 1]`; anything else passes the block through.
pub fn limit(block: &Block, ceiling: f64) -> StageOutcome {
    if !(0.0..=CEILING_RANGE.max).contains(&ceiling) {
        return StageOutcome::pass_through(
            block,
            DspFault::InvalidParameter {
                name: "ceiling",
                value: ceiling,
            },
        );
    }
    if let Err(fault) = StageOutcome::check_finite(block) {
        return StageOutcome::pass_through(block, fault);
    }

    StageOutcome::Processed(block.map(|x| x.clamp(-ceiling, ceiling)))
}

/// One-pole peak envelope follower
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack_ms: f64,
    release_ms: f64,
    attack_coeff: f64,
    release_coeff: f64,
    envelope: f64,
    sample_rate: f64,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f64) -> Self {
        let mut follower = Self {
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            sample_rate,
        };
        follower.update_coeffs();
        follower
    }

    /// Set attack and release times in milliseconds
    pub fn set_times(&mut self, attack_ms: f64, release_ms: f64) {
        self.attack_ms = attack_ms;
        self.release_ms = release_ms;
        self.update_coeffs();
    }

    fn update_coeffs(&mut self) {
        self.attack_coeff = time_coeff(self.attack_ms, self.sample_rate);
        self.release_coeff = time_coeff(self.release_ms, self.sample_rate);
    }

    #[inline]
    pub fn envelope(&self) -> f64 {
        self.envelope
    }

    #[inline(always)]
    pub fn process(&mut self, input: Sample) -> f64 {
        let abs_input = input.abs();
        let coeff = if abs_input > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = abs_input + coeff * (self.envelope - abs_input);
        self.envelope
    }
}

/// Smoothing coefficient for a time constant; zero (instant) when the
/// time or rate is unusable.
fn time_coeff(ms: f64, sample_rate: f64) -> f64 {
    let samples = ms * 0.001 * sample_rate;
    if samples.is_finite() && samples > 0.0 {
        (-1.0 / samples).exp()
    } else {
        0.0
    }
}

impl Processor for EnvelopeFollower {
    fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

impl ProcessorConfig for EnvelopeFollower {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_coeffs();
    }
}

/// Compressor driven by a smoothed envelope instead of `|x|`
///
/// Uses the same static curve as [`compress`] but applies it to the follower
/// output, so transients overshoot for roughly the attack time and gain
/// recovers over the release time.
#[derive(Debug, Clone)]
pub struct EnvelopeCompressor {
    follower: EnvelopeFollower,
}

impl EnvelopeCompressor {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            follower: EnvelopeFollower::new(sample_rate),
        }
    }

    pub fn set_times(&mut self, attack_ms: f64, release_ms: f64) {
        self.follower.set_times(attack_ms, release_ms);
    }

    pub fn process(&mut self, block: &Block, threshold: f64, ratio: f64) -> StageOutcome {
        if let Err(fault) = check_compressor_params(threshold, ratio) {
            return StageOutcome::pass_through(block, fault);
        }
        if let Err(fault) = StageOutcome::check_finite(block) {
            return StageOutcome::pass_through(block, fault);
        }

        let follower = &mut self.follower;
        StageOutcome::Processed(block.map(|x| {
            let envelope = follower.process(x);
            if envelope > threshold {
                let target = threshold + (envelope - threshold) / ratio;
                x * (target / envelope)
            } else {
                x
            }
        }))
    }
}

impl Processor for EnvelopeCompressor {
    fn reset(&mut self) {
        self.follower.reset();
    }
}

impl ProcessorConfig for EnvelopeCompressor {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.follower.set_sample_rate(sample_rate);
    }
}
