//! Persisted configuration record
//!
//! File shape:
//!
//! ```json
//! { "eq": [31 floats],
//!   "channels": { "front_left": { "gain": 0.0, "volume": 0.5, "highpass": 80.0,
//!                                 "lowpass": 20000.0, "delay": 0.0,
//!                                 "phase": false, "mute": false, "bypass": false } } }
//! ```
//!
//! Loading is lenient. `eqGains` is accepted for `eq` and display names such as
//! `"Front Left"` for channel keys. Unknown keys, wrong-typed values and
//! missing fields are skipped, down to a whole `eq` or channel entry of the
//! wrong shape.
//!
//! Older files store volume as a 0–100 percentage. A file is read as percent
//! when any of its volumes exceeds 1, and then every volume in it is divided
//! by 100. A percent file whose volumes are all 0 or 1 cannot be told apart
//! from a linear one and loads as linear.

use std::collections::BTreeMap;
use std::path::Path;

use hu_core::{ChannelBank, ChannelId, ChannelParam, ChannelSettings, ParamValue};
use hu_dsp::bands::{EqGains, NUM_BANDS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from reading or writing a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete parameter set as written to disk
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DspConfig {
    pub eq: EqGains,
    pub channels: ChannelBank,
}

impl DspConfig {
    /// Serialize every field.
    pub fn to_json(&self) -> ConfigResult<String> {
        let saved = SavedConfig {
            eq: self.eq.as_array(),
            channels: self
                .channels
                .iter()
                .map(|(id, settings)| (id.as_str(), SavedChannel::from(settings)))
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&saved)?)
    }

    /// Parse a file over factory defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let mut config = Self::default();
        ConfigPatch::from_json(json)?.apply(&mut config);
        Ok(config)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }
}

#[derive(Serialize)]
struct SavedConfig<'a> {
    eq: &'a [f64; NUM_BANDS],
    channels: BTreeMap<&'static str, SavedChannel>,
}

#[derive(Serialize)]
struct SavedChannel {
    gain: f64,
    volume: f64,
    highpass: f64,
    lowpass: f64,
    delay: f64,
    phase: bool,
    mute: bool,
    bypass: bool,
}

impl From<&ChannelSettings> for SavedChannel {
    fn from(s: &ChannelSettings) -> Self {
        Self {
            gain: s.gain_db,
            volume: s.volume,
            highpass: s.highpass_hz,
            lowpass: s.lowpass_hz,
            delay: s.delay_ms,
            phase: s.phase_invert,
            mute: s.mute,
            bypass: s.bypass,
        }
    }
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default, alias = "eqGains")]
    eq: Option<Value>,
    #[serde(default)]
    channels: Option<Value>,
}

/// The subset of a configuration file that resolved to known fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    eq: [Option<f64>; NUM_BANDS],
    channels: Vec<(ChannelId, ChannelParam, ParamValue)>,
}

impl ConfigPatch {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let mut patch = Self::default();

        match raw.eq {
            Some(Value::Array(values)) => {
                if values.len() > NUM_BANDS {
                    log::debug!("Config: ignoring EQ entries past band {}", NUM_BANDS - 1);
                }
                for (slot, value) in patch.eq.iter_mut().zip(&values) {
                    *slot = value.as_f64();
                }
            }
            Some(other) => log::debug!("Config: ignoring non-array eq {other}"),
            None => {}
        }

        let channels = match raw.channels {
            Some(Value::Object(channels)) => channels,
            Some(other) => {
                log::debug!("Config: ignoring non-object channels {other}");
                Default::default()
            }
            None => Default::default(),
        };
        for (name, fields) in channels {
            let Some(id) = ChannelId::parse(&name) else {
                log::debug!("Config: ignoring unknown channel '{name}'");
                continue;
            };
            let Value::Object(fields) = fields else {
                log::debug!("Config: ignoring non-object entry for {}", id.as_str());
                continue;
            };
            for (key, value) in fields {
                let Some(param) = ChannelParam::parse(&key).or_else(|| long_param_name(&key))
                else {
                    log::debug!("Config: ignoring unknown parameter '{key}' on {}", id.as_str());
                    continue;
                };
                let value = match value {
                    Value::Bool(b) => ParamValue::Flag(b),
                    Value::Number(n) => match n.as_f64() {
                        Some(v) => ParamValue::Number(v),
                        None => continue,
                    },
                    _ => continue,
                };
                patch.channels.push((id, param, value));
            }
        }

        if patch.volumes().any(|v| v > 1.0) {
            log::debug!("Config: reading volumes as percent");
            for (_, param, value) in patch.channels.iter_mut() {
                if let (ChannelParam::Volume, ParamValue::Number(v)) = (*param, value) {
                    *v /= 100.0;
                }
            }
        }

        Ok(patch)
    }

    fn volumes(&self) -> impl Iterator<Item = f64> + '_ {
        self.channels.iter().filter_map(|(_, param, value)| match (param, value) {
            (ChannelParam::Volume, ParamValue::Number(v)) => Some(*v),
            _ => None,
        })
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let patch = Self::from_json(&json)?;
        log::info!(
            "Loaded configuration from {} ({} channel fields)",
            path.display(),
            patch.channels.len()
        );
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        self.eq.iter().all(Option::is_none) && self.channels.is_empty()
    }

    /// Write every present field into `config`, clamping as it goes.
    pub fn apply(&self, config: &mut DspConfig) {
        for (band, gain) in self.eq.iter().enumerate() {
            if let Some(gain) = gain {
                config.eq.set(band, *gain);
            }
        }
        for &(id, param, value) in &self.channels {
            if !config.channels.get_mut(id).set(param, value) {
                log::debug!("Config: {param:?} on {} has the wrong type", id.as_str());
            }
        }
    }
}

/// Field names used by the in-memory record
fn long_param_name(key: &str) -> Option<ChannelParam> {
    match key {
        "gain_db" => Some(ChannelParam::Gain),
        "highpass_hz" => Some(ChannelParam::Highpass),
        "lowpass_hz" => Some(ChannelParam::Lowpass),
        "delay_ms" => Some(ChannelParam::Delay),
        "phase_invert" => Some(ChannelParam::Phase),
        _ => None,
    }
}
