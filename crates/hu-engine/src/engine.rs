//! Engine state machine and the processing/control split
//!
//! `DspEngine` lives on the processing thread and owns every stateful stage.
//! `EngineHandle` is cloned out to control and display threads. Both share
//! one `EngineShared` behind an `Arc`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use hu_core::{
    BASS_GAIN_RANGE, Block, CEILING_RANGE, ChannelId, ChannelParam, NUM_CHANNELS, ParamValue,
    RATIO_RANGE, Sample, THRESHOLD_RANGE,
};
use hu_dsp::analysis::{AnalysisSnapshot, SpectrumAnalyzer};
use hu_dsp::bass::{BassEnhancer, BassMode};
use hu_dsp::dynamics::{EnvelopeCompressor, compress, limit};
use hu_dsp::eq::GraphicEq;
use hu_dsp::metering::{LevelMeter, Levels};
use hu_dsp::{ProcessorConfig, StageOutcome};
use hu_state::{ConfigPatch, DspConfig, EqPreset};
use parking_lot::RwLock;

use crate::{
    ATTACK_RANGE, ChannelStrip, CompressorMode, ControlCommand, EngineParams, EngineStatus,
    RELEASE_RANGE, Telemetry,
};

/// Channel whose input feeds telemetry and the block counters when the
/// processing side runs one block per channel.
pub const METERED_CHANNEL: ChannelId = ChannelId::FrontLeft;

/// State shared between the engine and its handles
struct EngineShared {
    params: RwLock<EngineParams>,
    telemetry: RwLock<Telemetry>,
    selected: RwLock<ChannelId>,
    active: AtomicBool,
    sample_rate: AtomicU32,
    blocks_processed: AtomicU64,
    samples_processed: AtomicU64,
    faults: AtomicU64,
    created: Instant,
}

/// Stages that carry state from one block to the next on a single signal path
struct StagePath {
    envelope_compressor: EnvelopeCompressor,
    envelope_times: (f64, f64),
    bass: BassEnhancer,
}

impl StagePath {
    fn new(sample_rate: f64, attack_ms: f64, release_ms: f64) -> Self {
        let mut envelope_compressor = EnvelopeCompressor::new(sample_rate);
        envelope_compressor.set_times(attack_ms, release_ms);
        Self {
            envelope_compressor,
            envelope_times: (attack_ms, release_ms),
            bass: BassEnhancer::new(sample_rate),
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.envelope_compressor.set_sample_rate(sample_rate);
        self.bass.set_sample_rate(sample_rate);
    }
}

/// Processing side of the engine
pub struct DspEngine {
    shared: Arc<EngineShared>,
    eq: GraphicEq,
    mono: StagePath,
    paths: [StagePath; NUM_CHANNELS],
    analyzer: SpectrumAnalyzer,
    meter: LevelMeter,
    strips: [ChannelStrip; NUM_CHANNELS],
    sample_rate: u32,
}

impl DspEngine {
    /// Create an idle engine and a handle to control it.
    pub fn new(sample_rate: u32) -> (Self, EngineHandle) {
        let shared = Arc::new(EngineShared {
            params: RwLock::new(EngineParams::default()),
            telemetry: RwLock::new(Telemetry::default()),
            selected: RwLock::new(ChannelId::FrontLeft),
            active: AtomicBool::new(false),
            sample_rate: AtomicU32::new(sample_rate),
            blocks_processed: AtomicU64::new(0),
            samples_processed: AtomicU64::new(0),
            faults: AtomicU64::new(0),
            created: Instant::now(),
        });

        let rate = f64::from(sample_rate);
        let defaults = EngineParams::default().dynamics;
        let path = || StagePath::new(rate, defaults.attack_ms, defaults.release_ms);

        let engine = Self {
            shared: Arc::clone(&shared),
            eq: GraphicEq::new(rate),
            mono: path(),
            paths: std::array::from_fn(|_| path()),
            analyzer: SpectrumAnalyzer::new(rate),
            meter: LevelMeter::new(),
            strips: std::array::from_fn(|_| ChannelStrip::new(rate)),
            sample_rate,
        };

        (engine, EngineHandle { shared })
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run one block through EQ → dynamics → bass and refresh telemetry
    /// from the input.
    ///
    /// Returns `None` while idle; telemetry is then left untouched.
    pub fn process(&mut self, samples: &[Sample], sample_rate: u32) -> Option<Block> {
        self.run(samples, sample_rate, None).map(|(block, _)| block)
    }

    /// [`process`](Self::process) followed by `channel`'s output strip.
    ///
    /// Every channel has its own compressor envelope and bass filter state.
    /// Only [`METERED_CHANNEL`] refreshes telemetry, so the histories gain one
    /// entry per frame of channel blocks.
    pub fn process_channel(
        &mut self,
        channel: ChannelId,
        samples: &[Sample],
        sample_rate: u32,
    ) -> Option<Block> {
        let (block, params) = self.run(samples, sample_rate, Some(channel))?;
        let settings = params.channels.get(channel);
        Some(self.strips[channel.index()].process(&block, settings))
    }

    fn run(
        &mut self,
        samples: &[Sample],
        sample_rate: u32,
        channel: Option<ChannelId>,
    ) -> Option<(Block, EngineParams)> {
        if !self.shared.active.load(Ordering::Acquire) {
            return None;
        }

        let input = match Block::from_slice(samples, sample_rate) {
            Ok(block) => block,
            Err(e) => {
                log::warn!("Engine: dropping block: {e}");
                self.shared.faults.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let params = *self.shared.params.read();
        if sample_rate != self.sample_rate {
            self.update_sample_rate(sample_rate);
        }

        let mut faults = 0;
        let mut block = settle("eq", self.eq.apply(&input, &params.eq), &mut faults);

        let path = match channel {
            Some(id) => &mut self.paths[id.index()],
            None => &mut self.mono,
        };

        let dynamics = &params.dynamics;
        if dynamics.compressor_enabled {
            let outcome = match dynamics.mode {
                CompressorMode::Static => compress(&block, dynamics.threshold, dynamics.ratio),
                CompressorMode::Envelope => {
                    let times = (dynamics.attack_ms, dynamics.release_ms);
                    if times != path.envelope_times {
                        path.envelope_compressor.set_times(times.0, times.1);
                        path.envelope_times = times;
                    }
                    path.envelope_compressor
                        .process(&block, dynamics.threshold, dynamics.ratio)
                }
            };
            block = settle("compressor", outcome, &mut faults);
        }
        if dynamics.limiter_enabled {
            block = settle("limiter", limit(&block, dynamics.ceiling), &mut faults);
        }

        if params.bass.gain_db > 0.0 {
            path.bass.set_mode(params.bass.mode);
            let outcome = path.bass.process(&block, params.bass.gain_db);
            block = settle("bass", outcome, &mut faults);
        }

        if channel.is_none_or(|id| id == METERED_CHANNEL) {
            faults += self.publish_telemetry(&input);
        }
        if faults > 0 {
            self.shared.faults.fetch_add(faults, Ordering::Relaxed);
        }

        Some((block, params))
    }

    /// Analyze and meter `input`, then replace the shared telemetry.
    /// Returns the number of stages that skipped the block.
    fn publish_telemetry(&mut self, input: &Block) -> u64 {
        let mut faults = 0;
        if let Err(fault) = self.analyzer.analyze(input) {
            log::warn!("Engine: analyzer skipped block: {fault}");
            faults += 1;
        }
        let levels = match self.meter.measure(input) {
            Ok(levels) => levels,
            Err(fault) => {
                log::warn!("Engine: meter skipped block: {fault}");
                faults += 1;
                self.meter.current()
            }
        };

        let telemetry = Telemetry {
            analysis: self.analyzer.snapshot().clone(),
            levels,
            rms_history: self.meter.rms_history().to_vec(),
            peak_history: self.meter.peak_history().to_vec(),
        };
        *self.shared.telemetry.write() = telemetry;

        self.shared.blocks_processed.fetch_add(1, Ordering::Relaxed);
        self.shared
            .samples_processed
            .fetch_add(input.len() as u64, Ordering::Relaxed);
        faults
    }

    fn update_sample_rate(&mut self, sample_rate: u32) {
        log::debug!("Engine: sample rate {} -> {} Hz", self.sample_rate, sample_rate);
        let rate = f64::from(sample_rate);
        self.eq.set_sample_rate(rate);
        self.analyzer.set_sample_rate(rate);
        self.mono.set_sample_rate(rate);
        for path in self.paths.iter_mut() {
            path.set_sample_rate(rate);
        }
        for strip in self.strips.iter_mut() {
            strip.set_sample_rate(rate);
        }
        self.sample_rate = sample_rate;
        self.shared.sample_rate.store(sample_rate, Ordering::Relaxed);
    }
}

/// Unwrap a stage result, logging and counting a pass-through.
fn settle(stage: &str, outcome: StageOutcome, faults: &mut u64) -> Block {
    if let Some(fault) = outcome.fault() {
        log::warn!("Engine: {stage} passed block through: {fault}");
        *faults += 1;
    }
    outcome.into_block()
}

/// Control and telemetry access to a running engine
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    // ─── State ─────────────────────────────────────────────────────────

    pub fn start(&self) {
        if !self.shared.active.swap(true, Ordering::AcqRel) {
            log::info!("Engine started");
        }
    }

    pub fn stop(&self) {
        if self.shared.active.swap(false, Ordering::AcqRel) {
            log::info!("Engine stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    // ─── Parameters ────────────────────────────────────────────────────

    pub fn params(&self) -> EngineParams {
        *self.shared.params.read()
    }

    /// Set one EQ band; indices outside 0..=30 are ignored.
    pub fn set_band_gain(&self, band: usize, gain_db: f64) {
        if !self.shared.params.write().eq.set(band, gain_db) {
            log::debug!("Engine: ignoring EQ band {band}");
        }
    }

    pub fn apply_eq_preset(&self, preset: EqPreset) {
        self.shared.params.write().eq = preset.gains();
        log::info!("Engine: EQ preset {}", preset.name());
    }

    /// Set a channel parameter by name; unknown names are ignored.
    pub fn set_channel_parameter(&self, channel: &str, param: &str, value: impl Into<ParamValue>) {
        match (ChannelId::parse(channel), ChannelParam::parse(param)) {
            (Some(id), Some(param)) => self.set_channel(id, param, value.into()),
            _ => log::debug!("Engine: ignoring channel parameter {channel}/{param}"),
        }
    }

    pub fn set_channel(&self, id: ChannelId, param: ChannelParam, value: ParamValue) {
        if !self.shared.params.write().channels.get_mut(id).set(param, value) {
            log::debug!("Engine: {param:?} on {} rejected {value:?}", id.as_str());
        }
    }

    /// Choose the channel that `gain` and `delay` commands act on.
    pub fn select_channel(&self, channel: &str) {
        match ChannelId::parse(channel) {
            Some(id) => *self.shared.selected.write() = id,
            None => log::debug!("Engine: ignoring selection of channel '{channel}'"),
        }
    }

    pub fn selected_channel(&self) -> ChannelId {
        *self.shared.selected.read()
    }

    pub fn set_dynamics(&self, compressor_enabled: bool, limiter_enabled: bool) {
        let mut params = self.shared.params.write();
        params.dynamics.compressor_enabled = compressor_enabled;
        params.dynamics.limiter_enabled = limiter_enabled;
    }

    pub fn set_dynamics_params(&self, threshold: f64, ratio: f64, ceiling: f64) {
        let mut params = self.shared.params.write();
        params.dynamics.threshold = THRESHOLD_RANGE.clamp(threshold);
        params.dynamics.ratio = RATIO_RANGE.clamp(ratio);
        params.dynamics.ceiling = CEILING_RANGE.clamp(ceiling);
    }

    pub fn set_compressor_mode(&self, mode: CompressorMode) {
        self.shared.params.write().dynamics.mode = mode;
    }

    pub fn set_compressor_times(&self, attack_ms: f64, release_ms: f64) {
        let mut params = self.shared.params.write();
        params.dynamics.attack_ms = ATTACK_RANGE.clamp(attack_ms);
        params.dynamics.release_ms = RELEASE_RANGE.clamp(release_ms);
    }

    pub fn set_bass_boost(&self, gain_db: f64) {
        self.shared.params.write().bass.gain_db = BASS_GAIN_RANGE.clamp(gain_db);
    }

    pub fn set_bass_mode(&self, mode: BassMode) {
        self.shared.params.write().bass.mode = mode;
    }

    /// Apply a decoded control command.
    pub fn apply_command(&self, command: &ControlCommand) {
        match command {
            ControlCommand::Eq { band, value } => match usize::try_from(*band) {
                Ok(band) => self.set_band_gain(band, *value),
                Err(_) => log::debug!("Engine: ignoring EQ band {band}"),
            },
            ControlCommand::Channel {
                channel,
                param,
                value,
            } => self.set_channel_parameter(channel, param, *value),
            ControlCommand::SelectChannel { channel } => self.select_channel(channel),
            ControlCommand::Gain { value } => {
                self.set_channel(self.selected_channel(), ChannelParam::Gain, (*value).into());
            }
            ControlCommand::Delay { value } => {
                self.set_channel(self.selected_channel(), ChannelParam::Delay, (*value).into());
            }
            ControlCommand::LoadPresetFile { path } => match ConfigPatch::load_from_path(path) {
                Ok(patch) => self.load_config(&patch),
                Err(e) => log::warn!("Engine: cannot load preset file {path}: {e}"),
            },
            ControlCommand::Dynamics {
                compressor,
                limiter,
            } => self.set_dynamics(*compressor, *limiter),
            ControlCommand::DynamicsParams {
                threshold,
                ratio,
                ceiling,
            } => self.set_dynamics_params(*threshold, *ratio, *ceiling),
            ControlCommand::CompressorMode { mode } => self.set_compressor_mode(*mode),
            ControlCommand::Bass { value } => self.set_bass_boost(*value),
            ControlCommand::BassMode { mode } => self.set_bass_mode(*mode),
            ControlCommand::Preset { name } => match EqPreset::parse(name) {
                Some(preset) => self.apply_eq_preset(preset),
                None => log::debug!("Engine: unknown preset '{name}'"),
            },
            ControlCommand::Start => self.start(),
            ControlCommand::Stop => self.stop(),
        }
    }

    // ─── Configuration ─────────────────────────────────────────────────

    /// Apply the fields present in a loaded configuration.
    pub fn load_config(&self, patch: &ConfigPatch) {
        let mut params = self.shared.params.write();
        let mut config = DspConfig {
            eq: params.eq,
            channels: params.channels,
        };
        patch.apply(&mut config);
        params.eq = config.eq;
        params.channels = config.channels;
        log::info!("Engine: configuration applied");
    }

    pub fn save_config(&self) -> DspConfig {
        let params = self.shared.params.read();
        DspConfig {
            eq: params.eq,
            channels: params.channels,
        }
    }

    // ─── Telemetry ─────────────────────────────────────────────────────

    pub fn telemetry(&self) -> Telemetry {
        self.shared.telemetry.read().clone()
    }

    pub fn analysis_snapshot(&self) -> AnalysisSnapshot {
        self.shared.telemetry.read().analysis.clone()
    }

    pub fn levels(&self) -> Levels {
        self.shared.telemetry.read().levels
    }

    pub fn rms_history(&self) -> Vec<f64> {
        self.shared.telemetry.read().rms_history.clone()
    }

    pub fn peak_history(&self) -> Vec<f64> {
        self.shared.telemetry.read().peak_history.clone()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            active: self.is_active(),
            blocks_processed: self.shared.blocks_processed.load(Ordering::Relaxed),
            samples_processed: self.shared.samples_processed.load(Ordering::Relaxed),
            faults: self.shared.faults.load(Ordering::Relaxed),
            sample_rate: self.shared.sample_rate.load(Ordering::Relaxed),
            uptime_secs: self.shared.created.elapsed().as_secs_f64(),
        }
    }
}
