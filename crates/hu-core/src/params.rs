//! Parameter helpers: decibels and clamped ranges

use serde::{Deserialize, Serialize};

/// Decibel value wrapper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decibels(pub f64);

impl Decibels {
    pub const ZERO: Self = Self(0.0);

    #[inline]
    pub fn from_gain(gain: f64) -> Self {
        if gain <= 0.0 {
            Self(f64::NEG_INFINITY)
        } else {
            Self(20.0 * gain.log10())
        }
    }

    /// Linear amplitude, `10^(dB/20)`
    #[inline]
    pub fn to_gain(self) -> f64 {
        10.0_f64.powf(self.0 / 20.0)
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Inclusive parameter range with a default
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64, default: f64) -> Self {
        Self { min, max, default }
    }

    /// Clamp into range. Non-finite input falls back to the default.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }
}

/// Graphic EQ band gain (dB)
pub const EQ_GAIN_RANGE: ParamRange = ParamRange::new(-12.0, 12.0, 0.0);

/// Bass boost (dB)
pub const BASS_GAIN_RANGE: ParamRange = ParamRange::new(0.0, 24.0, 0.0);

/// Compressor threshold (linear amplitude)
pub const THRESHOLD_RANGE: ParamRange = ParamRange::new(0.0, 1.0, 0.7);

/// Compressor ratio
pub const RATIO_RANGE: ParamRange = ParamRange::new(1.0, 100.0, 4.0);

/// Limiter ceiling (linear amplitude, never above full scale)
pub const CEILING_RANGE: ParamRange = ParamRange::new(0.0, 1.0, 0.95);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decibels_to_gain() {
        assert!((Decibels(6.0).to_gain() - 1.995_262).abs() < 1e-6);
        assert!((Decibels::ZERO.to_gain() - 1.0).abs() < 1e-12);
        assert!((Decibels::from_gain(0.5).0 + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn test_range_clamp() {
        assert_eq!(EQ_GAIN_RANGE.clamp(20.0), 12.0);
        assert_eq!(EQ_GAIN_RANGE.clamp(-20.0), -12.0);
        assert_eq!(EQ_GAIN_RANGE.clamp(f64::NAN), 0.0);
        assert_eq!(CEILING_RANGE.clamp(1.5), 1.0);
    }
}
