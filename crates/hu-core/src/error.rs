//! Error types for the head-unit engine

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HuError {
    #[error("DSP error: {0}")]
    Dsp(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Result type alias
pub type HuResult<T> = Result<T, HuError>;
