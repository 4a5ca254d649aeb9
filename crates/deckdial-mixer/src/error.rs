//! Mixer error types.

use std::time::Duration;

use thiserror::Error;

/// Mixer error type.
#[derive(Debug, Error)]
pub enum MixerError {
    #[error("pactl failed: {0}")]
    CommandFailed(String),

    #[error("Could not parse pactl output: {0}")]
    ParseError(String),

    #[error("Sink did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Backend task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for mixer operations.
pub type MixerResult<T> = Result<T, MixerError>;
