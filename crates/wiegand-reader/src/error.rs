//! Error types for reader operations.
//!
//! This module defines error types for the hardware-facing side of the
//! decoder: edge sources going away, bad configuration, and edges arriving
//! on lines the reader was not configured for.

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur while reading from a Wiegand interface.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Edge source is not connected or has been disconnected.
    #[error("Edge source disconnected: {source_name}")]
    Disconnected { source_name: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Reader configuration error.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Invalid data received from the edge source.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Edge reported on a line that is neither DATA0 nor DATA1.
    #[error("Edge on unconfigured line {line}")]
    InvalidLine { line: u32 },

    /// Card format or record error.
    #[error(transparent)]
    Core(#[from] wiegand_core::Error),
}

impl ReaderError {
    /// Create a new disconnected error.
    pub fn disconnected(source_name: impl Into<String>) -> Self {
        Self::Disconnected {
            source_name: source_name.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new invalid line error.
    pub fn invalid_line(line: u32) -> Self {
        Self::InvalidLine { line }
    }
}
