//! Per-channel output strip
//!
//! HPF → LPF → delay → polarity → gain·volume → mute, run after the shared
//! pipeline. Filter and delay state persists across blocks.

use hu_core::{Block, ChannelSettings, Decibels};
use hu_dsp::biquad::{BUTTERWORTH_Q, BiquadTDF2};
use hu_dsp::delay::DelayLine;
use hu_dsp::{MonoProcessor, Processor, ProcessorConfig};

pub struct ChannelStrip {
    hpf: BiquadTDF2,
    lpf: BiquadTDF2,
    delay: DelayLine,
    /// Filter settings the biquads were last designed for
    designed: Option<(f64, f64)>,
    sample_rate: f64,
}

impl ChannelStrip {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            hpf: BiquadTDF2::new(sample_rate),
            lpf: BiquadTDF2::new(sample_rate),
            delay: DelayLine::new(sample_rate),
            designed: None,
            sample_rate,
        }
    }

    pub fn process(&mut self, block: &Block, settings: &ChannelSettings) -> Block {
        if settings.bypass {
            return block.clone();
        }

        let rate = f64::from(block.sample_rate());
        if rate != self.sample_rate {
            self.set_sample_rate(rate);
        }
        self.configure(settings);

        let mut samples = block.samples().to_vec();
        self.hpf.process_block(&mut samples);
        self.lpf.process_block(&mut samples);
        self.delay.process_block(&mut samples);

        let mut gain = Decibels(settings.gain_db).to_gain() * settings.volume;
        if settings.phase_invert {
            gain = -gain;
        }
        if settings.mute {
            gain = 0.0;
        }
        for s in samples.iter_mut() {
            *s *= gain;
        }

        block.with_samples(samples)
    }

    fn configure(&mut self, settings: &ChannelSettings) {
        let corners = (settings.highpass_hz, settings.lowpass_hz);
        if self.designed != Some(corners) {
            self.hpf.set_highpass(corners.0, BUTTERWORTH_Q);
            self.lpf.set_lowpass(corners.1, BUTTERWORTH_Q);
            self.designed = Some(corners);
        }
        self.delay.set_delay_ms(settings.delay_ms);
    }
}

impl Processor for ChannelStrip {
    fn reset(&mut self) {
        self.hpf.reset();
        self.lpf.reset();
        self.delay.reset();
    }
}

impl ProcessorConfig for ChannelStrip {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.hpf.set_sample_rate(sample_rate);
        self.lpf.set_sample_rate(sample_rate);
        self.delay.set_sample_rate(sample_rate);
        self.designed = None;
        self.reset();
    }
}
