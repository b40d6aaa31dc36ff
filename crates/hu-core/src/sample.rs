//! Sample types and the immutable audio block

use crate::{HuError, HuResult};

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// A mono block of samples tagged with its sample rate.
///
/// Stages never mutate a block they were handed; they build a new one with
/// [`Block::with_samples`], so every intermediate result stays inspectable.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    samples: Vec<Sample>,
    sample_rate: u32,
}

impl Block {
    /// Create a block, rejecting a zero sample rate.
    pub fn new(samples: Vec<Sample>, sample_rate: u32) -> HuResult<Self> {
        if sample_rate == 0 {
            return Err(HuError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Copy a slice into a new block.
    pub fn from_slice(samples: &[Sample], sample_rate: u32) -> HuResult<Self> {
        Self::new(samples.to_vec(), sample_rate)
    }

    /// All-zero block
    pub fn silence(len: usize, sample_rate: u32) -> HuResult<Self> {
        Self::new(vec![0.0; len], sample_rate)
    }

    /// Build a sibling block with the same sample rate.
    #[inline]
    pub fn with_samples(&self, samples: Vec<Sample>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Map every sample into a new block.
    #[inline]
    pub fn map<F: FnMut(Sample) -> Sample>(&self, f: F) -> Self {
        self.with_samples(self.samples.iter().copied().map(f).collect())
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Index of the first NaN/Inf sample, if any
    pub fn first_non_finite(&self) -> Option<usize> {
        self.samples.iter().position(|s| !s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert_eq!(
            Block::new(vec![0.0; 4], 0),
            Err(HuError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn test_with_samples_keeps_rate() {
        let block = Block::from_slice(&[0.1, 0.2], 48000).unwrap();
        let doubled = block.map(|s| s * 2.0);
        assert_eq!(doubled.sample_rate(), 48000);
        assert_eq!(doubled.samples(), &[0.2, 0.4]);
        // Source untouched
        assert_eq!(block.samples(), &[0.1, 0.2]);
    }

    #[test]
    fn test_first_non_finite() {
        let block = Block::from_slice(&[0.0, 0.5, f64::NAN, 1.0], 44100).unwrap();
        assert_eq!(block.first_non_finite(), Some(2));
        assert_eq!(Block::silence(8, 44100).unwrap().first_non_finite(), None);
    }
}
