//! Error types for Deckdial core.

use thiserror::Error;

/// Core error type for Deckdial operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid hex byte: {0:?}")]
    InvalidHex(String),

    #[error("Signature must contain at least one byte")]
    EmptySignature,

    #[error("Signature too long: {0} bytes (max {max})", max = crate::report::MAX_REPORT_LEN)]
    SignatureTooLong(usize),

    #[error("Duplicate signature: {0}")]
    DuplicateSignature(String),
}

/// Result type alias for Deckdial core operations.
pub type Result<T> = std::result::Result<T, Error>;
