//! DSP Integration Tests
//!
//! Runs blocks through the full stage chain the engine uses:
//! EQ → compressor → limiter → bass, with analysis and metering on the side.

use approx::assert_abs_diff_eq;
use hu_core::Block;
use hu_dsp::analysis::SpectrumAnalyzer;
use hu_dsp::bands::{BAND_FREQUENCIES, EqGains, NUM_BANDS};
use hu_dsp::bass::{BassEnhancer, BassMode, boost};
use hu_dsp::biquad::{BUTTERWORTH_Q, BiquadTDF2};
use hu_dsp::delay::DelayLine;
use hu_dsp::dynamics::{compress, limit};
use hu_dsp::eq::GraphicEq;
use hu_dsp::metering::LevelMeter;
use hu_dsp::{FFT_SIZE, HISTORY_CAPACITY, MonoProcessor, StageOutcome};
use realfft::RealFftPlanner;

const SAMPLE_RATE: u32 = 44100;

/// Generate test sine wave
fn generate_sine(samples: usize, freq: f64, amplitude: f64) -> Block {
    let data = (0..samples)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect();
    Block::new(data, SAMPLE_RATE).unwrap()
}

/// Deterministic pseudo-noise in [-1, 1]
fn generate_noise(samples: usize) -> Block {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let data = (0..samples)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64 / u64::MAX as f64) * 2.0 - 1.0
        })
        .collect();
    Block::new(data, SAMPLE_RATE).unwrap()
}

fn is_valid_signal(signal: &[f64]) -> bool {
    signal.iter().all(|x| x.is_finite())
}

fn magnitudes(samples: &[f64]) -> Vec<f64> {
    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);
    let mut input = samples[..FFT_SIZE].to_vec();
    let mut output = fft.make_output_vec();
    fft.process(&mut input, &mut output).unwrap();
    output.iter().map(|c| c.norm()).collect()
}

/// Engine-order chain with every stage enabled
fn run_chain(eq: &mut GraphicEq, gains: &EqGains, block: &Block) -> Block {
    let block = eq.apply(block, gains).into_block();
    let block = compress(&block, 0.7, 4.0).into_block();
    let block = limit(&block, 0.95).into_block();
    boost(&block, 3.0).into_block()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNAL INTEGRITY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_chain_signal_integrity() {
    let mut eq = GraphicEq::new(SAMPLE_RATE as f64);
    let mut gains = EqGains::flat();
    for band in 0..NUM_BANDS {
        gains.set(band, if band % 2 == 0 { 12.0 } else { -12.0 });
    }

    let input = generate_noise(4410);
    let output = run_chain(&mut eq, &gains, &input);

    assert_eq!(output.len(), input.len());
    assert!(is_valid_signal(output.samples()), "chain produced invalid signal");
}

#[test]
fn test_chain_output_is_bounded_by_ceiling_and_boost() {
    let mut eq = GraphicEq::new(SAMPLE_RATE as f64);
    let input = generate_noise(2048);
    let output = run_chain(&mut eq, &EqGains::flat(), &input);

    let factor = 1.0 + 0.1 * 10.0_f64.powf(3.0 / 20.0);
    assert!(output.samples().iter().all(|s| s.abs() <= 0.95 * factor + 1e-12));
}

#[test]
fn test_non_finite_block_survives_every_stage() {
    let mut samples = vec![0.5; 1024];
    samples[100] = f64::NAN;
    let input = Block::new(samples, SAMPLE_RATE).unwrap();

    let mut eq = GraphicEq::new(SAMPLE_RATE as f64);
    let mut gains = EqGains::flat();
    gains.set(10, 3.0);

    let outcomes: [StageOutcome; 4] = [
        eq.apply(&input, &gains),
        compress(&input, 0.7, 4.0),
        limit(&input, 0.95),
        boost(&input, 6.0),
    ];
    for outcome in outcomes {
        assert!(!outcome.is_processed());
        assert_eq!(outcome.block().len(), input.len());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EQUALIZER TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_zero_gain_eq_is_idempotent() {
    let mut eq = GraphicEq::new(SAMPLE_RATE as f64);
    let input = generate_noise(1000);
    let once = eq.apply(&input, &EqGains::flat()).into_block();
    let twice = eq.apply(&once, &EqGains::flat()).into_block();
    assert_eq!(once, input);
    assert_eq!(twice, input);
}

#[test]
fn test_band_boost_scales_its_bin() {
    let band = 5;
    let mut gains = EqGains::flat();
    gains.set(band, 6.0);

    let mut eq = GraphicEq::new(SAMPLE_RATE as f64);
    let input = generate_sine(FFT_SIZE, BAND_FREQUENCIES[band], 0.5);
    let output = eq.apply(&input, &gains).into_block();

    let before = magnitudes(input.samples());
    let after = magnitudes(output.samples());
    let bin = eq.bin_for_band(band).unwrap();
    let expected = 10.0_f64.powf(6.0 / 20.0);

    assert_abs_diff_eq!(after[bin] / before[bin], expected, epsilon = 1e-9);
    for (k, (a, b)) in after.iter().zip(&before).enumerate() {
        if k != bin {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_eq_leaves_tail_untouched() {
    let mut gains = EqGains::flat();
    gains.set(20, -6.0);
    let mut eq = GraphicEq::new(SAMPLE_RATE as f64);
    let input = generate_noise(900);
    let output = eq.apply(&input, &gains).into_block();
    assert_eq!(&output.samples()[FFT_SIZE..], &input.samples()[FFT_SIZE..]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// DYNAMICS TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_limiter_on_full_scale_constant() {
    let positive = Block::new(vec![1.0; 512], SAMPLE_RATE).unwrap();
    let negative = Block::new(vec![-1.0; 512], SAMPLE_RATE).unwrap();

    let out = limit(&positive, 0.95).into_block();
    assert!(out.samples().iter().all(|s| *s == 0.95));

    let out = limit(&negative, 0.95).into_block();
    assert!(out.samples().iter().all(|s| *s == -0.95));
}

#[test]
fn test_compressor_never_increases_magnitude() {
    let input = generate_noise(4096);
    let output = compress(&input, 0.3, 8.0).into_block();
    for (x, y) in input.samples().iter().zip(output.samples()) {
        assert!(y.abs() <= x.abs() + 1e-15);
        assert_eq!(x.signum(), y.signum());
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BASS / FILTER TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_low_shelf_state_carries_across_blocks() {
    let mut split = BassEnhancer::new(SAMPLE_RATE as f64);
    split.set_mode(BassMode::LowShelf);
    let mut whole = split.clone();

    let input = generate_sine(2048, 60.0, 0.3);
    let first = Block::from_slice(&input.samples()[..1024], SAMPLE_RATE).unwrap();
    let second = Block::from_slice(&input.samples()[1024..], SAMPLE_RATE).unwrap();

    let mut joined = split.process(&first, 6.0).into_block().into_samples();
    joined.extend(split.process(&second, 6.0).into_block().into_samples());
    let reference = whole.process(&input, 6.0).into_block();

    for (a, b) in joined.iter().zip(reference.samples()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
}

#[test]
fn test_crossover_and_delay_signal_integrity() {
    let mut hpf = BiquadTDF2::new(SAMPLE_RATE as f64);
    hpf.set_highpass(80.0, BUTTERWORTH_Q);
    let mut lpf = BiquadTDF2::new(SAMPLE_RATE as f64);
    lpf.set_lowpass(5000.0, BUTTERWORTH_Q);
    let mut delay = DelayLine::new(SAMPLE_RATE as f64);
    delay.set_delay_ms(20.0);

    let mut buffer = generate_noise(8192).into_samples();
    hpf.process_block(&mut buffer);
    lpf.process_block(&mut buffer);
    delay.process_block(&mut buffer);

    assert!(is_valid_signal(&buffer));
    assert!(buffer[..delay.delay_samples()].iter().all(|s| *s == 0.0));
}

// ═══════════════════════════════════════════════════════════════════════════════
// TELEMETRY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_silence_telemetry_is_zero() {
    let mut meter = LevelMeter::new();
    let levels = meter.measure(&Block::silence(512, SAMPLE_RATE).unwrap()).unwrap();
    assert_eq!(levels.rms, 0.0);
    assert_eq!(levels.peak, 0.0);
}

#[test]
fn test_history_never_exceeds_capacity() {
    let mut meter = LevelMeter::new();
    for i in 0..(HISTORY_CAPACITY * 3) {
        let block = generate_sine(256, 440.0, (i % 10) as f64 / 10.0);
        meter.measure(&block).unwrap();
        assert!(meter.rms_history().len() <= HISTORY_CAPACITY);
    }
    assert_eq!(meter.peak_history().len(), HISTORY_CAPACITY);
}

#[test]
fn test_analyzer_tracks_tone_band() {
    let mut analyzer = SpectrumAnalyzer::new(SAMPLE_RATE as f64);
    analyzer.analyze(&generate_sine(4410, 2000.0, 0.5)).unwrap();
    let bands = analyzer.snapshot().bands();

    // 2 kHz sits in the 2000 → 2500 Hz interval (band 20)
    let loudest = (0..NUM_BANDS - 1)
        .max_by(|a, b| bands[*a].total_cmp(&bands[*b]))
        .unwrap();
    assert_eq!(loudest, 20);
}
