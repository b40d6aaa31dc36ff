//! Closed channel model for the six head-unit outputs
//!
//! Channel identifiers and their parameter names form closed sets; any name
//! that does not resolve is ignored by callers instead of raising an error.

use serde::{Deserialize, Serialize};

use crate::{HuError, ParamRange};

/// Channel gain trim (dB)
pub const CHANNEL_GAIN_RANGE: ParamRange = ParamRange::new(-20.0, 20.0, 0.0);
/// Channel volume (linear)
pub const CHANNEL_VOLUME_RANGE: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
/// High-pass corner (Hz)
pub const HIGHPASS_RANGE: ParamRange = ParamRange::new(20.0, 500.0, 80.0);
/// Low-pass corner (Hz)
pub const LOWPASS_RANGE: ParamRange = ParamRange::new(1000.0, 20000.0, 20000.0);
/// Time alignment delay (ms)
pub const DELAY_RANGE: ParamRange = ParamRange::new(0.0, 20.0, 0.0);

/// Number of output channels
pub const NUM_CHANNELS: usize = 6;

/// Output channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelId {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
    Subwoofer,
    Center,
}

impl ChannelId {
    pub const ALL: [ChannelId; NUM_CHANNELS] = [
        ChannelId::FrontLeft,
        ChannelId::FrontRight,
        ChannelId::RearLeft,
        ChannelId::RearRight,
        ChannelId::Subwoofer,
        ChannelId::Center,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name (snake case)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrontLeft => "front_left",
            Self::FrontRight => "front_right",
            Self::RearLeft => "rear_left",
            Self::RearRight => "rear_right",
            Self::Subwoofer => "subwoofer",
            Self::Center => "center",
        }
    }

    /// Display name used by the control surface
    pub fn label(self) -> &'static str {
        match self {
            Self::FrontLeft => "Front Left",
            Self::FrontRight => "Front Right",
            Self::RearLeft => "Rear Left",
            Self::RearRight => "Rear Right",
            Self::Subwoofer => "Subwoofer",
            Self::Center => "Center",
        }
    }

    /// Resolve a wire or display name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == name || id.label().eq_ignore_ascii_case(name))
    }
}

impl std::str::FromStr for ChannelId {
    type Err = HuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| HuError::InvalidParam(format!("unknown channel '{s}'")))
    }
}

/// Named per-channel parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelParam {
    Gain,
    Volume,
    Highpass,
    Lowpass,
    Delay,
    Phase,
    Mute,
    Bypass,
}

impl ChannelParam {
    /// Resolve a parameter name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gain" => Some(Self::Gain),
            "volume" => Some(Self::Volume),
            "highpass" | "hpf" => Some(Self::Highpass),
            "lowpass" | "lpf" => Some(Self::Lowpass),
            "delay" => Some(Self::Delay),
            "phase" => Some(Self::Phase),
            "mute" => Some(Self::Mute),
            "bypass" => Some(Self::Bypass),
            _ => None,
        }
    }

    #[inline]
    pub fn is_flag(self) -> bool {
        matches!(self, Self::Phase | Self::Mute | Self::Bypass)
    }
}

/// Value carried by a channel parameter update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Number(f64),
}

impl ParamValue {
    fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(v),
            _ => None,
        }
    }

    fn as_flag(self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(b),
            Self::Number(v) if v.is_finite() => Some(v != 0.0),
            Self::Number(_) => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Fixed-shape settings record for one output channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub gain_db: f64,
    pub volume: f64,
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
    pub delay_ms: f64,
    pub phase_invert: bool,
    pub mute: bool,
    pub bypass: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            gain_db: CHANNEL_GAIN_RANGE.default,
            volume: CHANNEL_VOLUME_RANGE.default,
            highpass_hz: HIGHPASS_RANGE.default,
            lowpass_hz: LOWPASS_RANGE.default,
            delay_ms: DELAY_RANGE.default,
            phase_invert: false,
            mute: false,
            bypass: false,
        }
    }
}

impl ChannelSettings {
    /// Factory defaults for a given output
    pub fn default_for(id: ChannelId) -> Self {
        let base = Self::default();
        match id {
            ChannelId::RearLeft | ChannelId::RearRight => Self {
                volume: 0.45,
                ..base
            },
            ChannelId::Subwoofer => Self {
                gain_db: 6.0,
                volume: 0.6,
                ..base
            },
            _ => base,
        }
    }

    /// Apply one parameter. Returns `false` when the value type does not fit
    /// the parameter, in which case nothing changes.
    pub fn set(&mut self, param: ChannelParam, value: ParamValue) -> bool {
        if param.is_flag() {
            let Some(flag) = value.as_flag() else {
                return false;
            };
            match param {
                ChannelParam::Phase => self.phase_invert = flag,
                ChannelParam::Mute => self.mute = flag,
                _ => self.bypass = flag,
            }
            return true;
        }

        let Some(v) = value.as_number() else {
            return false;
        };
        match param {
            ChannelParam::Gain => self.gain_db = CHANNEL_GAIN_RANGE.clamp(v),
            ChannelParam::Volume => self.volume = CHANNEL_VOLUME_RANGE.clamp(v),
            ChannelParam::Highpass => self.highpass_hz = HIGHPASS_RANGE.clamp(v),
            ChannelParam::Lowpass => self.lowpass_hz = LOWPASS_RANGE.clamp(v),
            _ => self.delay_ms = DELAY_RANGE.clamp(v),
        }
        true
    }
}

/// Settings for all six outputs, indexed by [`ChannelId`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBank {
    channels: [ChannelSettings; NUM_CHANNELS],
}

impl Default for ChannelBank {
    fn default() -> Self {
        Self {
            channels: ChannelId::ALL.map(ChannelSettings::default_for),
        }
    }
}

impl ChannelBank {
    #[inline]
    pub fn get(&self, id: ChannelId) -> &ChannelSettings {
        &self.channels[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ChannelId) -> &mut ChannelSettings {
        &mut self.channels[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &ChannelSettings)> {
        ChannelId::ALL.into_iter().zip(self.channels.iter())
    }
}
