//! 31-band graphic equalizer applied in the frequency domain
//!
//! Each call shapes only the first [`FFT_SIZE`] samples of the block: forward
//! transform, scale the bin nearest each band center, inverse transform, and
//! splice the result back. Samples past the segment pass through untouched.
//! There is no overlap between blocks, so phase is not continuous across
//! block boundaries.

use std::sync::Arc;

use hu_core::{Block, Decibels, Sample};
use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::bands::{nearest_bin, EqGains, BAND_FREQUENCIES, NUM_BANDS};
use crate::{DspFault, ProcessorConfig, StageOutcome, FFT_SIZE, SPECTRUM_BINS};

/// FFT-domain graphic equalizer
///
/// Holds the FFT plans and scratch buffers so the hot path does not allocate
/// beyond the output block. No signal state is carried between calls.
pub struct GraphicEq {
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    time_buffer: Vec<f64>,
    spectrum: Vec<Complex<f64>>,
    sample_rate: f64,
    /// Target bin for each band at the current sample rate
    band_bins: [usize; NUM_BANDS],
}

impl GraphicEq {
    pub fn new(sample_rate: f64) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(FFT_SIZE);
        let inverse = planner.plan_fft_inverse(FFT_SIZE);

        let time_buffer = forward.make_input_vec();
        let spectrum = forward.make_output_vec();

        Self {
            forward,
            inverse,
            time_buffer,
            spectrum,
            sample_rate,
            band_bins: band_bins(sample_rate),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Bin that band `band` scales at the current sample rate
    pub fn bin_for_band(&self, band: usize) -> Option<usize> {
        self.band_bins.get(band).copied()
    }

    /// Apply `gains` to `block`, returning a block of identical length.
    pub fn apply(&mut self, block: &Block, gains: &EqGains) -> StageOutcome {
        if gains.is_flat() {
            return StageOutcome::Processed(block.clone());
        }
        if block.len() < FFT_SIZE {
            return StageOutcome::Processed(block.clone());
        }
        if let Err(fault) = StageOutcome::check_finite(block) {
            return StageOutcome::pass_through(block, fault);
        }

        let rate = f64::from(block.sample_rate());
        if rate != self.sample_rate {
            self.set_sample_rate(rate);
        }

        match self.shape_segment(&block.samples()[..FFT_SIZE], gains) {
            Ok(()) => {
                let mut out: Vec<Sample> = block.samples().to_vec();
                out[..FFT_SIZE].copy_from_slice(&self.time_buffer);
                StageOutcome::Processed(block.with_samples(out))
            }
            Err(fault) => StageOutcome::pass_through(block, fault),
        }
    }

    /// Transform `segment`, scale band bins, and leave the shaped segment in
    /// `time_buffer`.
    fn shape_segment(&mut self, segment: &[Sample], gains: &EqGains) -> Result<(), DspFault> {
        self.time_buffer.copy_from_slice(segment);
        self.forward
            .process(&mut self.time_buffer, &mut self.spectrum)
            .map_err(|e| DspFault::Transform(e.to_string()))?;

        // The one-sided spectrum stands for each bin and its conjugate mirror,
        // so scaling here scales both halves.
        for (band, &gain_db) in gains.as_array().iter().enumerate() {
            if gain_db == 0.0 {
                continue;
            }
            let gain = Decibels(gain_db).to_gain();
            self.spectrum[self.band_bins[band]] *= gain;
        }

        self.inverse
            .process(&mut self.spectrum, &mut self.time_buffer)
            .map_err(|e| DspFault::Transform(e.to_string()))?;

        let norm = 1.0 / FFT_SIZE as f64;
        for sample in self.time_buffer.iter_mut() {
            *sample *= norm;
        }

        if let Some(index) = self.time_buffer.iter().position(|s| !s.is_finite()) {
            return Err(DspFault::NonFinite { index });
        }
        Ok(())
    }
}

impl ProcessorConfig for GraphicEq {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        log::debug!("GraphicEq: remapping bands for {sample_rate} Hz");
        self.sample_rate = sample_rate;
        self.band_bins = band_bins(sample_rate);
    }
}

fn band_bins(sample_rate: f64) -> [usize; NUM_BANDS] {
    BAND_FREQUENCIES.map(|freq| nearest_bin(freq, sample_rate, FFT_SIZE, SPECTRUM_BINS))
}
