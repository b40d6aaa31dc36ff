//! Per-stage result type
//!
//! Every stage either produces a new block or hands its input back together
//! with the reason it could not process it. Callers never see a panic or an
//! error escape a stage.

use hu_core::{Block, HuError};
use thiserror::Error;

/// Soft failure inside a DSP stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspFault {
    #[error("non-finite sample at index {index}")]
    NonFinite { index: usize },

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("transform failed: {0}")]
    Transform(String),
}

impl From<DspFault> for HuError {
    fn from(fault: DspFault) -> Self {
        HuError::Dsp(fault.to_string())
    }
}

/// Result of running one stage on one block
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Stage ran; the block is its output
    Processed(Block),
    /// Stage faulted; the block is the untouched input
    PassThrough { block: Block, fault: DspFault },
}

impl StageOutcome {
    /// Fall back to a copy of the input
    pub fn pass_through(input: &Block, fault: DspFault) -> Self {
        Self::PassThrough {
            block: input.clone(),
            fault,
        }
    }

    /// Reject blocks containing NaN/Inf before a stage touches them
    pub(crate) fn check_finite(input: &Block) -> Result<(), DspFault> {
        match input.first_non_finite() {
            Some(index) => Err(DspFault::NonFinite { index }),
            None => Ok(()),
        }
    }

    pub fn block(&self) -> &Block {
        match self {
            Self::Processed(block) | Self::PassThrough { block, .. } => block,
        }
    }

    pub fn into_block(self) -> Block {
        match self {
            Self::Processed(block) | Self::PassThrough { block, .. } => block,
        }
    }

    pub fn fault(&self) -> Option<&DspFault> {
        match self {
            Self::Processed(_) => None,
            Self::PassThrough { fault, .. } => Some(fault),
        }
    }

    #[inline]
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}
