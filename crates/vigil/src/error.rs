//! Error types for the Vigil API.

use thiserror::Error;

use vigil_events::{EventError, RuntimeError};
use vigil_policy::PolicyError;

/// Configuration problems. Always fatal: a session is never built from
/// a configuration that fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid JSON for [`VigilConfig`](crate::VigilConfig).
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum VigilError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A policy refused or deferred a decision.
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Event pipeline error.
    #[error("event error: {0}")]
    Events(#[from] EventError),

    /// Runtime call failed.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// The analysis task panicked or was aborted.
    #[error("analysis task failed: {0}")]
    Join(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, VigilError>;
