//! Engine Error Types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the engine
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Component alignment must be a power of two, got {0}")]
    NonPowerOfTwoAlign(usize),

    #[error("Sample set needs {needed} bytes, exceeding the {max}-byte message limit")]
    SampleSetTooLarge { needed: usize, max: usize },

    #[error("Sample set record is truncated: have {have} bytes, need {need}")]
    TruncatedRecord { have: usize, need: usize },

    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("Failed to open output file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to join the disk writer thread")]
    ThreadJoin,

    #[error("Engine already running")]
    AlreadyRunning,

    #[error("Engine not running")]
    NotRunning,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("DSP error: {0}")]
    Dsp(#[from] pulsar_dsp::DspError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type CoreResult<T> = Result<T, CoreError>;
