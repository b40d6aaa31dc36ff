//! Control channel commands
//!
//! One JSON object per command, discriminated by `cmd`:
//!
//! ```json
//! {"cmd": "eq", "band": 5, "value": 2.5}
//! {"cmd": "channel", "channel": "front_left", "param": "gain", "value": 3.0}
//! {"cmd": "dynamics", "compressor": true, "limiter": true}
//! {"cmd": "bass", "value": 6.0}
//! {"cmd": "select_channel", "channel": "Rear Left"}
//! {"cmd": "gain", "value": -2.0}
//! {"cmd": "load_preset_file", "path": "/sdcard/dsp_presets/preset_manual.json"}
//! {"cmd": "start"}
//! ```
//!
//! `gain` and `delay` act on the channel chosen by the last `select_channel`
//! (front left until one arrives). Names are kept as strings so an unknown
//! channel or parameter decodes fine and is dropped when applied.

use hu_core::ParamValue;
use hu_dsp::bass::BassMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CompressorMode;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ControlCommand {
    Eq {
        band: i64,
        value: f64,
    },
    Channel {
        channel: String,
        param: String,
        value: ParamValue,
    },
    SelectChannel {
        channel: String,
    },
    Gain {
        value: f64,
    },
    Delay {
        value: f64,
    },
    LoadPresetFile {
        path: String,
    },
    Dynamics {
        compressor: bool,
        limiter: bool,
    },
    DynamicsParams {
        threshold: f64,
        ratio: f64,
        ceiling: f64,
    },
    CompressorMode {
        mode: CompressorMode,
    },
    Bass {
        value: f64,
    },
    BassMode {
        mode: BassMode,
    },
    Preset {
        name: String,
    },
    Start,
    Stop,
}

impl ControlCommand {
    pub fn from_json(json: &str) -> Result<Self, CommandError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, CommandError> {
        Ok(serde_json::to_string(self)?)
    }
}
