use thiserror::Error;

use crate::types::FormatId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Format errors
    #[error("No card format registered for id {0}")]
    UnknownFormat(FormatId),

    #[error("Bit count mismatch: expected {expected}, got {actual}")]
    BitCountMismatch { expected: u32, actual: u32 },

    #[error("Even parity check failed over the leading {bits} bits")]
    EvenParity { bits: u32 },

    #[error("Odd parity check failed over the trailing {bits} bits")]
    OddParity { bits: u32 },

    // Layout errors
    #[error("Invalid format layout: {0}")]
    InvalidLayout(String),

    #[error("Field {field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error came from a parity check rather than a shape mismatch.
    pub fn is_parity(&self) -> bool {
        matches!(self, Self::EvenParity { .. } | Self::OddParity { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
