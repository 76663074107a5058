//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while constructing or validating core values.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Classification thresholds are not a usable interval.
    #[error("invalid thresholds: low={low}, high={high}")]
    InvalidThresholds { low: f64, high: f64 },

    /// A code stub identifier could not be parsed.
    #[error("invalid code identifier: {0}")]
    InvalidCode(String),

    /// A key identifier is empty or otherwise unusable.
    #[error("invalid key identifier: {0}")]
    InvalidKeyId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
