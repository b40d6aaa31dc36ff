//! Biquad filters in Transposed Direct Form II
//!
//! Used by the channel strips (high-pass / low-pass crossover) and by the
//! low-shelf bass mode. Coefficient design falls back to a bypass section
//! whenever the math would produce non-finite values.

use hu_core::Sample;
use std::f64::consts::PI;

use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Q giving a maximally flat (Butterworth) second-order response
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Normalized biquad coefficients (a0 == 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::bypass()
    }
}

impl BiquadCoeffs {
    /// Unity gain, no filtering
    pub const fn bypass() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let Some((cos_w, alpha)) = prewarp(freq, q, sample_rate) else {
            return Self::bypass();
        };
        normalize(
            (1.0 - cos_w) * 0.5,
            1.0 - cos_w,
            (1.0 - cos_w) * 0.5,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        let Some((cos_w, alpha)) = prewarp(freq, q, sample_rate) else {
            return Self::bypass();
        };
        normalize(
            (1.0 + cos_w) * 0.5,
            -(1.0 + cos_w),
            (1.0 + cos_w) * 0.5,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    /// RBJ low shelf; `gain_db` is the shelf gain below `freq`
    pub fn low_shelf(freq: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let Some((cos_w, alpha)) = prewarp(freq, q, sample_rate) else {
            return Self::bypass();
        };
        if !gain_db.is_finite() {
            return Self::bypass();
        }
        let a = 10.0_f64.powf(gain_db / 40.0);
        let k = 2.0 * a.sqrt() * alpha;

        normalize(
            a * ((a + 1.0) - (a - 1.0) * cos_w + k),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
            a * ((a + 1.0) - (a - 1.0) * cos_w - k),
            (a + 1.0) + (a - 1.0) * cos_w + k,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
            (a + 1.0) + (a - 1.0) * cos_w - k,
        )
    }
}

/// `(cos w0, alpha)` for a corner clamped below Nyquist, or `None` if the
/// inputs are unusable.
fn prewarp(freq: f64, q: f64, sample_rate: f64) -> Option<(f64, f64)> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 || !q.is_finite() || q <= 0.0 {
        return None;
    }
    let max_hz = (sample_rate * 0.5 * 0.9).max(1.0);
    if !freq.is_finite() {
        return None;
    }
    let freq = freq.clamp(1.0, max_hz);

    let w0 = 2.0 * PI * freq / sample_rate;
    Some((w0.cos(), w0.sin() / (2.0 * q)))
}

fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadCoeffs {
    if !a0.is_finite() || a0.abs() < 1e-12 {
        return BiquadCoeffs::bypass();
    }
    let coeffs = BiquadCoeffs {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    };
    let all_finite = [coeffs.b0, coeffs.b1, coeffs.b2, coeffs.a1, coeffs.a2]
        .iter()
        .all(|v| v.is_finite());
    if all_finite {
        coeffs
    } else {
        BiquadCoeffs::bypass()
    }
}

/// Transposed Direct Form II biquad filter
#[derive(Debug, Clone)]
pub struct BiquadTDF2 {
    coeffs: BiquadCoeffs,
    z1: f64,
    z2: f64,
    sample_rate: f64,
}

impl BiquadTDF2 {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            coeffs: BiquadCoeffs::bypass(),
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        }
    }

    #[inline]
    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn set_lowpass(&mut self, freq: f64, q: f64) {
        self.coeffs = BiquadCoeffs::lowpass(freq, q, self.sample_rate);
    }

    pub fn set_highpass(&mut self, freq: f64, q: f64) {
        self.coeffs = BiquadCoeffs::highpass(freq, q, self.sample_rate);
    }

    pub fn set_low_shelf(&mut self, freq: f64, q: f64, gain_db: f64) {
        self.coeffs = BiquadCoeffs::low_shelf(freq, q, gain_db, self.sample_rate);
    }
}

impl Processor for BiquadTDF2 {
    fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl MonoProcessor for BiquadTDF2 {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}

impl ProcessorConfig for BiquadTDF2 {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }
}
