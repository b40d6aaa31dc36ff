//! Spectrum analysis for the display path
//!
//! Windows the first [`FFT_SIZE`] samples of a block with a symmetric Hann
//! window, keeps the [`SPECTRUM_BINS`] positive-frequency magnitudes, and
//! averages them into per-band dB levels.

use std::sync::Arc;

use hu_core::Block;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::Serialize;

use crate::bands::{nearest_bin, BAND_FREQUENCIES, NUM_BANDS};
use crate::{DspFault, ProcessorConfig, StageOutcome, FFT_SIZE, SPECTRUM_BINS};

/// Level reported for a band whose mean magnitude is not positive
pub const SILENT_BAND_DB: f64 = -60.0;

/// Added before the log so a vanishing mean stays finite
const LOG_FLOOR: f64 = 1e-10;

/// Most recent completed analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSnapshot {
    spectrum: Vec<f64>,
    bands: [f64; NUM_BANDS],
}

impl Default for AnalysisSnapshot {
    fn default() -> Self {
        Self {
            spectrum: vec![0.0; SPECTRUM_BINS],
            bands: [0.0; NUM_BANDS],
        }
    }
}

impl AnalysisSnapshot {
    /// Unnormalized magnitudes of the first 256 bins
    pub fn spectrum(&self) -> &[f64] {
        &self.spectrum
    }

    /// Per-band levels in dB
    pub fn bands(&self) -> &[f64; NUM_BANDS] {
        &self.bands
    }
}

/// Hann-windowed FFT analyzer
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    scratch: Vec<f64>,
    output: Vec<Complex<f64>>,
    /// `(start, end)` bin for each band interval at the current rate
    band_ranges: [(usize, usize); NUM_BANDS - 1],
    sample_rate: f64,
    snapshot: AnalysisSnapshot,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f64) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        let window = (0..FFT_SIZE)
            .map(|i| {
                0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (FFT_SIZE - 1) as f64).cos()
            })
            .collect();

        Self {
            scratch: fft.make_input_vec(),
            output: fft.make_output_vec(),
            fft,
            window,
            band_ranges: band_ranges(sample_rate),
            sample_rate,
            snapshot: AnalysisSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &AnalysisSnapshot {
        &self.snapshot
    }

    /// Analyze the head of `block`.
    ///
    /// Returns `Ok(true)` when the snapshot was replaced and `Ok(false)` when
    /// the block is too short to analyze. On a fault the previous snapshot is
    /// kept.
    pub fn analyze(&mut self, block: &Block) -> Result<bool, DspFault> {
        if block.len() < FFT_SIZE {
            return Ok(false);
        }
        StageOutcome::check_finite(block)?;

        let rate = f64::from(block.sample_rate());
        if rate != self.sample_rate {
            self.set_sample_rate(rate);
        }

        for ((dst, &x), &w) in self
            .scratch
            .iter_mut()
            .zip(&block.samples()[..FFT_SIZE])
            .zip(&self.window)
        {
            *dst = x * w;
        }
        self.fft
            .process(&mut self.scratch, &mut self.output)
            .map_err(|e| DspFault::Transform(e.to_string()))?;

        let spectrum: Vec<f64> = self.output[..SPECTRUM_BINS]
            .iter()
            .map(|c| c.norm())
            .collect();

        let mut bands = self.snapshot.bands;
        for (band, &(start, end)) in self.band_ranges.iter().enumerate() {
            if start >= end {
                continue;
            }
            let mean = spectrum[start..end].iter().sum::<f64>() / (end - start) as f64;
            bands[band] = if mean > 0.0 {
                20.0 * (mean + LOG_FLOOR).log10()
            } else {
                SILENT_BAND_DB
            };
        }

        self.snapshot = AnalysisSnapshot { spectrum, bands };
        Ok(true)
    }
}

impl ProcessorConfig for SpectrumAnalyzer {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        log::debug!("SpectrumAnalyzer: remapping bands for {sample_rate} Hz");
        self.sample_rate = sample_rate;
        self.band_ranges = band_ranges(sample_rate);
    }
}

fn band_ranges(sample_rate: f64) -> [(usize, usize); NUM_BANDS - 1] {
    std::array::from_fn(|band| {
        let start = nearest_bin(BAND_FREQUENCIES[band], sample_rate, FFT_SIZE, SPECTRUM_BINS);
        let end = nearest_bin(BAND_FREQUENCIES[band + 1], sample_rate, FFT_SIZE, SPECTRUM_BINS);
        (start, end)
    })
}
