//! Head-unit simulator
//!
//! Feeds a synthetic tone through the DSP engine with the same roles the
//! head unit has: capture thread → processing thread, a control side that
//! applies configuration and commands, and a display poller reading
//! telemetry.
//!
//! Usage:
//!   hu-sim                                 - 2 s of 440 Hz at 44.1 kHz
//!   hu-sim --config dsp_config.json        - apply a saved configuration
//!   hu-sim --commands cmds.jsonl --fast    - replay control commands, unpaced

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};

use hu_core::{DEFAULT_SAMPLE_RATE, Sample};
use hu_dsp::bands::BAND_FREQUENCIES;
use hu_engine::{ControlCommand, DspEngine, EngineHandle};
use hu_state::{ConfigPatch, EqPreset};

#[derive(Parser)]
#[command(name = "hu-sim", about = "Run a synthetic tone through the head-unit DSP engine")]
struct Cli {
    /// Sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Samples per block
    #[arg(long, default_value_t = 4410)]
    block_size: usize,

    /// Seconds of audio to generate
    #[arg(long, default_value_t = 2.0)]
    duration: f64,

    /// Test tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    tone: f64,

    /// Test tone peak amplitude
    #[arg(long, default_value_t = 0.1)]
    amplitude: f64,

    /// Configuration file to load before starting
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// EQ curve to apply (flat, v-shape)
    #[arg(short, long)]
    preset: Option<String>,

    /// File of JSON control commands, one per line
    #[arg(long)]
    commands: Option<PathBuf>,

    /// Do not pace capture to real time
    #[arg(long)]
    fast: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.sample_rate == 0 || cli.block_size == 0 {
        bail!("sample rate and block size must be positive");
    }
    if !cli.duration.is_finite() || cli.duration <= 0.0 {
        bail!("duration must be positive");
    }

    let (mut engine, handle) = DspEngine::new(cli.sample_rate);
    configure(&cli, &handle)?;
    handle.start();

    let total_blocks =
        ((cli.duration * f64::from(cli.sample_rate)) / cli.block_size as f64).ceil() as usize;
    let period = Duration::from_secs_f64(cli.block_size as f64 / f64::from(cli.sample_rate));
    log::info!(
        "Simulating {} blocks of {} samples at {} Hz ({:.1} Hz tone)",
        total_blocks,
        cli.block_size,
        cli.sample_rate,
        cli.tone
    );

    let (block_tx, block_rx) = bounded::<Vec<Sample>>(4);
    let (done_tx, done_rx) = bounded::<()>(0);

    let capture = {
        let tone = ToneSource::new(cli.tone, cli.amplitude, cli.sample_rate);
        let pace = (!cli.fast).then_some(period);
        let block_size = cli.block_size;
        thread::Builder::new()
            .name("capture".into())
            .spawn(move || capture_loop(tone, block_size, total_blocks, pace, block_tx))
            .context("spawning capture thread")?
    };

    let display = {
        let handle = handle.clone();
        thread::Builder::new()
            .name("display".into())
            .spawn(move || display_loop(handle, done_rx))
            .context("spawning display thread")?
    };

    let sample_rate = cli.sample_rate;
    let processing = thread::Builder::new()
        .name("processing".into())
        .spawn(move || {
            let mut processed = 0usize;
            for samples in block_rx {
                if engine.process(&samples, sample_rate).is_some() {
                    processed += 1;
                }
            }
            processed
        })
        .context("spawning processing thread")?;

    let captured = capture
        .join()
        .map_err(|_| anyhow::anyhow!("capture thread panicked"))?;
    let processed = processing
        .join()
        .map_err(|_| anyhow::anyhow!("processing thread panicked"))?;
    drop(done_tx);
    display
        .join()
        .map_err(|_| anyhow::anyhow!("display thread panicked"))?;

    handle.stop();
    log::info!("Captured {captured} blocks, processed {processed}");
    println!("{}", serde_json::to_string_pretty(&handle.status())?);
    Ok(())
}

/// Control role: configuration file, preset, then command replay.
fn configure(cli: &Cli, handle: &EngineHandle) -> Result<()> {
    if let Some(path) = &cli.config {
        let patch = ConfigPatch::load_from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?;
        handle.load_config(&patch);
    }

    if let Some(name) = &cli.preset {
        match EqPreset::parse(name) {
            Some(preset) => handle.apply_eq_preset(preset),
            None => bail!("unknown preset '{name}'"),
        }
    }

    if let Some(path) = &cli.commands {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading commands {}", path.display()))?;
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match ControlCommand::from_json(line) {
                Ok(command) => handle.apply_command(&command),
                Err(e) => log::warn!("{}:{}: {e}", path.display(), line_no + 1),
            }
        }
    }
    Ok(())
}

/// Continuous sine generator
struct ToneSource {
    phase: f64,
    step: f64,
    amplitude: f64,
}

impl ToneSource {
    fn new(freq: f64, amplitude: f64, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            step: 2.0 * std::f64::consts::PI * freq / f64::from(sample_rate),
            amplitude,
        }
    }

    fn next_block(&mut self, len: usize) -> Vec<Sample> {
        (0..len)
            .map(|_| {
                let s = self.amplitude * self.phase.sin();
                self.phase = (self.phase + self.step) % std::f64::consts::TAU;
                s
            })
            .collect()
    }
}

fn capture_loop(
    mut tone: ToneSource,
    block_size: usize,
    total_blocks: usize,
    pace: Option<Duration>,
    tx: Sender<Vec<Sample>>,
) -> usize {
    let mut sent = 0;
    for _ in 0..total_blocks {
        if tx.send(tone.next_block(block_size)).is_err() {
            log::warn!("Capture: processing side hung up");
            break;
        }
        sent += 1;
        if let Some(period) = pace {
            thread::sleep(period);
        }
    }
    sent
}

fn display_loop(handle: EngineHandle, done: Receiver<()>) {
    let ticker = tick(Duration::from_millis(100));
    loop {
        select! {
            recv(ticker) -> _ => report(&handle),
            recv(done) -> _ => break,
        }
    }
    report(&handle);
}

fn report(handle: &EngineHandle) {
    let telemetry = handle.telemetry();
    let loudest = telemetry
        .analysis
        .bands()
        .iter()
        .enumerate()
        .take(BAND_FREQUENCIES.len() - 1)
        .max_by(|a, b| a.1.total_cmp(b.1));

    match loudest {
        Some((band, db)) => log::info!(
            "rms {:.4} peak {:.4} | loudest band {} Hz at {:.1} dB",
            telemetry.levels.rms,
            telemetry.levels.peak,
            BAND_FREQUENCIES[band],
            db
        ),
        None => log::info!(
            "rms {:.4} peak {:.4}",
            telemetry.levels.rms,
            telemetry.levels.peak
        ),
    }
}
