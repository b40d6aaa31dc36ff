//! 31-band ISO third-octave table shared by the equalizer and the analyzer

use serde::Serialize;

use hu_core::EQ_GAIN_RANGE;

/// Number of graphic EQ / analyzer bands
pub const NUM_BANDS: usize = 31;

/// Band center frequencies in Hz, strictly increasing
pub const BAND_FREQUENCIES: [f64; NUM_BANDS] = [
    20.0, 25.0, 31.0, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0, 16000.0, 20000.0,
];

/// Index of the bin (among the first `bins`) whose center is closest to `freq`.
///
/// Bin `k` sits at `k * sample_rate / fft_size`. Ties go to the lower bin;
/// frequencies past the last bin map onto it.
pub fn nearest_bin(freq: f64, sample_rate: f64, fft_size: usize, bins: usize) -> usize {
    if bins == 0 || !sample_rate.is_finite() || sample_rate <= 0.0 || !freq.is_finite() {
        return 0;
    }
    let bin_hz = sample_rate / fft_size as f64;
    let pos = (freq / bin_hz).max(0.0);
    let lower = pos.floor();
    let nearest = if pos - lower > 0.5 { lower + 1.0 } else { lower };
    (nearest as usize).min(bins - 1)
}

/// Per-band gain in dB, each clamped to [-12, +12]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EqGains([f64; NUM_BANDS]);

impl Default for EqGains {
    fn default() -> Self {
        Self::flat()
    }
}

impl EqGains {
    pub const fn flat() -> Self {
        Self([0.0; NUM_BANDS])
    }

    /// Build from up to 31 values; missing bands stay flat, extras are dropped.
    pub fn from_slice(gains: &[f64]) -> Self {
        let mut set = Self::flat();
        for (band, &gain) in gains.iter().enumerate().take(NUM_BANDS) {
            set.set(band, gain);
        }
        set
    }

    /// Set one band. Out-of-range indices are ignored and return `false`.
    pub fn set(&mut self, band: usize, gain_db: f64) -> bool {
        match self.0.get_mut(band) {
            Some(slot) => {
                *slot = EQ_GAIN_RANGE.clamp(gain_db);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn get(&self, band: usize) -> Option<f64> {
        self.0.get(band).copied()
    }

    #[inline]
    pub fn as_array(&self) -> &[f64; NUM_BANDS] {
        &self.0
    }

    /// True when every band sits at exactly 0 dB
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.0.iter().all(|&g| g == 0.0)
    }
}
