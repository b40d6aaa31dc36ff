//! Integer-sample delay line for per-channel time alignment

use hu_core::Sample;

use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Longest alignment delay a channel strip can request
pub const MAX_DELAY_MS: f64 = 20.0;

/// Circular-buffer delay with whole-sample resolution
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<Sample>,
    write_pos: usize,
    delay_samples: usize,
    delay_ms: f64,
    sample_rate: f64,
}

impl DelayLine {
    pub fn new(sample_rate: f64) -> Self {
        let mut line = Self {
            buffer: Vec::new(),
            write_pos: 0,
            delay_samples: 0,
            delay_ms: 0.0,
            sample_rate,
        };
        line.allocate();
        line
    }

    /// Set the delay, clamped to `[0, MAX_DELAY_MS]`.
    pub fn set_delay_ms(&mut self, delay_ms: f64) {
        self.delay_ms = if delay_ms.is_finite() {
            delay_ms.clamp(0.0, MAX_DELAY_MS)
        } else {
            0.0
        };
        self.delay_samples = ms_to_samples(self.delay_ms, self.sample_rate)
            .min(self.buffer.len().saturating_sub(1));
    }

    #[inline]
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    fn allocate(&mut self) {
        let capacity = ms_to_samples(MAX_DELAY_MS, self.sample_rate) + 1;
        self.buffer = vec![0.0; capacity];
        self.write_pos = 0;
        self.set_delay_ms(self.delay_ms);
    }
}

fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return 0;
    }
    (ms * 0.001 * sample_rate).round() as usize
}

impl Processor for DelayLine {
    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

impl MonoProcessor for DelayLine {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        if self.delay_samples == 0 {
            return input;
        }
        let len = self.buffer.len();
        self.buffer[self.write_pos] = input;
        let read_pos = (self.write_pos + len - self.delay_samples) % len;
        self.write_pos = (self.write_pos + 1) % len;
        self.buffer[read_pos]
    }
}

impl ProcessorConfig for DelayLine {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.allocate();
    }
}
