//! Error types for the policy module.

use thiserror::Error;

/// Errors a policy may surface to the runtime.
///
/// The permissive policy never produces these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy refused the request.
    #[error("policy denied: {0}")]
    Denied(String),

    /// The policy cannot decide yet (e.g. awaiting a human).
    #[error("policy deferred: {0}")]
    Deferred(String),
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
