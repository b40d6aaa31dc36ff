//! Built-in EQ curves offered by the control surface

use hu_dsp::bands::{EqGains, NUM_BANDS};
use serde::{Deserialize, Serialize};

/// Bass and treble lifted, mids scooped
const V_SHAPE: [f64; NUM_BANDS] = [
    -2.0, -1.0, 0.0, 2.0, 4.0, 6.0, 4.0, 2.0, 0.0, -1.0, -2.0, -3.0, -4.0, -4.0, -4.0, -4.0, -4.0,
    -3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 4.0, 2.0, 0.0, -2.0,
];

/// Named EQ curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqPreset {
    Flat,
    VShape,
}

impl EqPreset {
    pub const ALL: [EqPreset; 2] = [EqPreset::Flat, EqPreset::VShape];

    pub fn name(self) -> &'static str {
        match self {
            Self::Flat => "Flat",
            Self::VShape => "V-Shape",
        }
    }

    /// Resolve a preset by display or wire name
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|p| {
            p.name().eq_ignore_ascii_case(name)
                || matches!((p, name), (Self::VShape, "v_shape") | (Self::Flat, "flat"))
        })
    }

    pub fn gains(self) -> EqGains {
        match self {
            Self::Flat => EqGains::flat(),
            Self::VShape => EqGains::from_slice(&V_SHAPE),
        }
    }
}
