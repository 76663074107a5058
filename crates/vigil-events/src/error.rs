//! Error types for the events module.

use thiserror::Error;

/// Errors surfaced by the encrypted runtime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeError {
    /// The update carried a stale revision.
    #[error("update conflict on {container_id}: revision {rev:?} is stale")]
    Conflict {
        container_id: String,
        rev: Option<String>,
    },

    /// Temporary failure (I/O, timeout); the call may succeed later.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The payload could not be decrypted or decoded.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The subscription channel is closed.
    #[error("subscription channel closed")]
    ChannelClosed,

    /// Any other failure.
    #[error("runtime failure: {0}")]
    Fatal(String),
}

impl RuntimeError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RuntimeError::Conflict { .. } | RuntimeError::Transient(_))
    }
}

/// Errors raised by this crate's own operations.
#[derive(Debug, Error)]
pub enum EventError {
    /// Consumer configuration is unusable.
    #[error("invalid consumer configuration: {0}")]
    InvalidConfig(String),

    /// Filter serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Runtime call failed.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Core value rejected.
    #[error("core error: {0}")]
    Core(#[from] vigil_core::CoreError),
}

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(RuntimeError::Conflict {
            container_id: "c".into(),
            rev: None
        }
        .is_recoverable());
        assert!(RuntimeError::Transient("timeout".into()).is_recoverable());

        assert!(!RuntimeError::NotFound("c".into()).is_recoverable());
        assert!(!RuntimeError::Decryption("bad tag".into()).is_recoverable());
        assert!(!RuntimeError::ChannelClosed.is_recoverable());
        assert!(!RuntimeError::Fatal("boom".into()).is_recoverable());
    }
}
