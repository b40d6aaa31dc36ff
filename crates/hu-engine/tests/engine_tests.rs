//! Engine integration tests
//!
//! Drives the engine the way the head unit does: a processing thread calling
//! `process()`, and control/display code working through an `EngineHandle`.

use std::thread;

use approx::assert_abs_diff_eq;
use hu_core::{ChannelId, ChannelParam, ParamValue};
use hu_dsp::HISTORY_CAPACITY;
use hu_dsp::analysis::AnalysisSnapshot;
use hu_dsp::bass::BassMode;
use hu_engine::{CompressorMode, ControlCommand, DspEngine, METERED_CHANNEL};
use hu_state::{ConfigPatch, EqPreset};

const SR: u32 = 44100;

fn sine(len: usize, freq: f64, amplitude: f64) -> Vec<f64> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / SR as f64).sin())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEAD-UNIT SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_silence_with_defaults() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();

    let out = engine.process(&[0.0; 512], SR).unwrap();
    assert_eq!(out.len(), 512);
    assert!(out.samples().iter().all(|s| *s == 0.0));

    let levels = handle.levels();
    assert_eq!(levels.rms, 0.0);
    assert_eq!(levels.peak, 0.0);
}

#[test]
fn test_limiter_clamps_full_scale() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(false, true);
    handle.start();

    let out = engine.process(&[1.0; 512], SR).unwrap();
    assert!(out.samples().iter().all(|s| *s == 0.95));

    let out = engine.process(&[-1.0; 512], SR).unwrap();
    assert!(out.samples().iter().all(|s| *s == -0.95));
}

#[test]
fn test_out_of_range_band_is_noop() {
    let input = sine(1024, 1000.0, 0.4);

    let (mut reference, ref_handle) = DspEngine::new(SR);
    ref_handle.start();
    let expected = reference.process(&input, SR).unwrap();

    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();
    handle.set_band_gain(31, 5.0);
    assert_eq!(handle.params(), ref_handle.params());
    assert_eq!(engine.process(&input, SR).unwrap(), expected);
}

#[test]
fn test_stop_freezes_telemetry() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();
    engine.process(&sine(1024, 440.0, 0.5), SR).unwrap();
    let before = handle.telemetry();
    let status = handle.status();

    handle.stop();
    assert!(engine.process(&sine(1024, 2000.0, 0.9), SR).is_none());

    assert_eq!(handle.telemetry(), before);
    assert_eq!(handle.status().blocks_processed, status.blocks_processed);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_telemetry_reflects_input_not_output() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(true, true);
    handle.set_bass_boost(12.0);
    handle.start();

    engine.process(&[0.9; 600], SR).unwrap();
    let levels = handle.levels();
    assert_abs_diff_eq!(levels.rms, 0.9, epsilon = 1e-12);
    assert_eq!(levels.peak, 0.9);
}

#[test]
fn test_stage_order_compress_limit_boost() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(true, true);
    handle.set_bass_boost(6.0);
    handle.start();

    let out = engine.process(&[1.0; 8], SR).unwrap();
    // compress 1.0 -> 0.775, under the ceiling, then broadband boost
    let expected = 0.775 * (1.0 + 0.1 * 10.0_f64.powf(6.0 / 20.0));
    for s in out.samples() {
        assert_abs_diff_eq!(*s, expected, epsilon = 1e-12);
    }
}

#[test]
fn test_envelope_mode_selected() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(true, false);
    handle.set_compressor_mode(CompressorMode::Envelope);
    handle.start();

    let out = engine.process(&[0.9; 4410], SR).unwrap();
    // The follower starts at zero, so the first sample is barely touched.
    assert!(out.samples()[0] > 0.89);
    assert_abs_diff_eq!(out.samples()[4409], 0.75, epsilon = 1e-3);
}

#[test]
fn test_non_finite_block_passes_through_and_counts() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(true, true);
    handle.start();
    engine.process(&sine(512, 440.0, 0.2), SR).unwrap();
    let before = handle.analysis_snapshot();

    let mut input = vec![0.5; 512];
    input[3] = f64::NAN;
    let out = engine.process(&input, SR).unwrap();

    assert!(out.samples()[3].is_nan());
    assert_eq!(out.samples()[0], 0.5);
    assert_eq!(handle.analysis_snapshot(), before);
    // compressor, limiter, analyzer, meter
    assert_eq!(handle.status().faults, 4);
}

#[test]
fn test_short_block_keeps_analysis() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();
    engine.process(&[0.1; 100], SR).unwrap();
    assert_eq!(handle.analysis_snapshot(), AnalysisSnapshot::default());
    assert_eq!(handle.rms_history().len(), 1);
}

#[test]
fn test_histories_are_bounded() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();
    let blocks = HISTORY_CAPACITY + 25;
    let level = |i: usize| (i + 1) as f64 * 0.005;
    for i in 0..blocks {
        engine.process(&vec![level(i); 256], SR).unwrap();
    }

    // Oldest 25 dropped, the rest in arrival order.
    let expected: Vec<f64> = (25..blocks).map(level).collect();
    let rms = handle.rms_history();
    let peak = handle.peak_history();
    assert_eq!(rms.len(), HISTORY_CAPACITY);
    assert_eq!(peak.len(), HISTORY_CAPACITY);
    for ((r, p), e) in rms.iter().zip(&peak).zip(&expected) {
        assert_abs_diff_eq!(*r, *e, epsilon = 1e-12);
        assert_eq!(*p, *e);
    }

    let status = handle.status();
    assert_eq!(status.blocks_processed, blocks as u64);
    assert_eq!(status.samples_processed, 256 * blocks as u64);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANNEL STRIP TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_process_channel_applies_strip() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();
    handle.set_channel_parameter("Front Left", "mute", true);

    let out = engine
        .process_channel(ChannelId::FrontLeft, &sine(512, 440.0, 0.5), SR)
        .unwrap();
    assert!(out.samples().iter().all(|s| *s == 0.0));

    handle.set_channel(ChannelId::Center, ChannelParam::Bypass, ParamValue::Flag(true));
    let input = sine(512, 440.0, 0.5);
    let out = engine.process_channel(ChannelId::Center, &input, SR).unwrap();
    assert_eq!(out.samples(), input.as_slice());
}

#[test]
fn test_channels_keep_separate_bass_state() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_bass_boost(12.0);
    handle.set_bass_mode(BassMode::LowShelf);
    for id in ChannelId::ALL {
        handle.set_channel(id, ChannelParam::Bypass, ParamValue::Flag(true));
    }
    handle.start();

    let loud = engine
        .process_channel(ChannelId::FrontLeft, &[0.5; 512], SR)
        .unwrap();
    assert!(loud.samples().iter().any(|s| s.abs() > 0.5));

    // Silence in must stay silence out; the front-left shelf state is not shared.
    let quiet = engine
        .process_channel(ChannelId::FrontRight, &[0.0; 512], SR)
        .unwrap();
    assert!(quiet.samples().iter().all(|s| *s == 0.0));
}

#[test]
fn test_channels_keep_separate_envelopes() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(true, false);
    handle.set_compressor_mode(CompressorMode::Envelope);
    handle.start();

    for _ in 0..4 {
        engine
            .process_channel(ChannelId::Subwoofer, &[0.9; 4410], SR)
            .unwrap();
    }
    // A fresh envelope barely touches the first sample on another channel.
    let out = engine
        .process_channel(ChannelId::Center, &[0.9; 64], SR)
        .unwrap();
    assert!(out.samples()[0] > 0.89);
}

#[test]
fn test_one_history_entry_per_channel_frame() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.start();

    for id in ChannelId::ALL {
        let level = if id == METERED_CHANNEL { 0.25 } else { 0.75 };
        engine.process_channel(id, &[level; 512], SR).unwrap();
    }

    assert_eq!(handle.rms_history().len(), 1);
    assert_eq!(handle.peak_history(), vec![0.25]);
    assert_eq!(handle.levels().peak, 0.25);
    assert_eq!(handle.status().blocks_processed, 1);
}

#[test]
fn test_unknown_channel_names_are_ignored() {
    let (_engine, handle) = DspEngine::new(SR);
    let before = handle.params();
    handle.set_channel_parameter("trunk", "gain", 3.0);
    handle.set_channel_parameter("front_left", "pan", 0.5);
    assert_eq!(handle.params(), before);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL AND CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_commands_from_wire() {
    let (mut engine, handle) = DspEngine::new(SR);
    let wire = [
        r#"{"cmd":"eq","band":5,"value":2.5}"#,
        r#"{"cmd":"eq","band":-1,"value":9.0}"#,
        r#"{"cmd":"channel","channel":"subwoofer","param":"volume","value":0.8}"#,
        r#"{"cmd":"dynamics","compressor":true,"limiter":false}"#,
        r#"{"cmd":"bass","value":4.0}"#,
        r#"{"cmd":"start"}"#,
    ];
    for line in wire {
        handle.apply_command(&ControlCommand::from_json(line).unwrap());
    }

    let params = handle.params();
    assert_eq!(params.eq.get(5), Some(2.5));
    assert_eq!(params.channels.get(ChannelId::Subwoofer).volume, 0.8);
    assert!(params.dynamics.compressor_enabled);
    assert!(!params.dynamics.limiter_enabled);
    assert_eq!(params.bass.gain_db, 4.0);
    assert!(engine.process(&[0.0; 64], SR).is_some());

    handle.apply_command(&ControlCommand::Stop);
    assert!(engine.process(&[0.0; 64], SR).is_none());
}

#[test]
fn test_gain_and_delay_follow_selected_channel() {
    let (_engine, handle) = DspEngine::new(SR);
    assert_eq!(handle.selected_channel(), ChannelId::FrontLeft);

    let wire = [
        r#"{"cmd":"gain","value":2.0}"#,
        r#"{"cmd":"select_channel","channel":"Rear Right"}"#,
        r#"{"cmd":"gain","value":-4.0}"#,
        r#"{"cmd":"delay","value":6.5}"#,
        r#"{"cmd":"select_channel","channel":"boot"}"#,
        r#"{"cmd":"delay","value":50.0}"#,
    ];
    for line in wire {
        handle.apply_command(&ControlCommand::from_json(line).unwrap());
    }

    let params = handle.params();
    assert_eq!(handle.selected_channel(), ChannelId::RearRight);
    assert_eq!(params.channels.get(ChannelId::FrontLeft).gain_db, 2.0);
    let rr = params.channels.get(ChannelId::RearRight);
    assert_eq!(rr.gain_db, -4.0);
    // Unknown selection is ignored; the delay clamps at 20 ms.
    assert_eq!(rr.delay_ms, 20.0);
}

#[test]
fn test_load_preset_file_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("preset_manual.json");
    let mut gains = vec![0.0; 31];
    gains[4] = 3.5;
    std::fs::write(&path, serde_json::json!({ "eq": gains }).to_string()).unwrap();

    let (_engine, handle) = DspEngine::new(SR);
    let command = ControlCommand::LoadPresetFile {
        path: path.display().to_string(),
    };
    handle.apply_command(&ControlCommand::from_json(&command.to_json().unwrap()).unwrap());
    assert_eq!(handle.params().eq.get(4), Some(3.5));

    // A missing file leaves the parameters alone.
    let before = handle.params();
    handle.apply_command(&ControlCommand::LoadPresetFile {
        path: dir.path().join("missing.json").display().to_string(),
    });
    assert_eq!(handle.params(), before);
}

#[test]
fn test_preset_then_config_round_trip() {
    let (_engine, handle) = DspEngine::new(SR);
    handle.apply_eq_preset(EqPreset::VShape);
    handle.set_channel(ChannelId::RearLeft, ChannelParam::Delay, ParamValue::Number(7.0));

    let json = handle.save_config().to_json().unwrap();

    let (_other, restored) = DspEngine::new(SR);
    restored.load_config(&ConfigPatch::from_json(&json).unwrap());
    assert_eq!(restored.save_config(), handle.save_config());
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_control_thread_while_processing() {
    let (mut engine, handle) = DspEngine::new(SR);
    handle.set_dynamics(true, true);
    handle.start();

    let control = handle.clone();
    let writer = thread::spawn(move || {
        for i in 0..2000 {
            let band = i % 31;
            control.set_band_gain(band, if i % 2 == 0 { 12.0 } else { -12.0 });
        }
        control.apply_eq_preset(EqPreset::Flat);
    });

    let display = handle.clone();
    let reader = thread::spawn(move || {
        for _ in 0..500 {
            let telemetry = display.telemetry();
            assert_eq!(telemetry.analysis.spectrum().len(), 256);
            assert_eq!(telemetry.rms_history.len(), telemetry.peak_history.len());
            assert!(telemetry.rms_history.len() <= HISTORY_CAPACITY);
        }
    });

    let block = sine(4410, 440.0, 0.1);
    for _ in 0..200 {
        let out = engine.process(&block, SR).unwrap();
        assert!(out.samples().iter().all(|s| s.is_finite()));
    }

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(handle.status().faults, 0);
}
