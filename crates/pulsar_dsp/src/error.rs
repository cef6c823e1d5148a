//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP operations
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(u64),

    #[error("Constant envelopes have no decay duration to solve for")]
    ConstantHasNoDecay,

    #[error("Spectral window size must be at least 2, got {0}")]
    InvalidWindowSize(usize),
}
