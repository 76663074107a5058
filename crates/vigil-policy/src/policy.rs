//! The trust decision interface.

use std::collections::HashMap;

use vigil_core::{Actor, ActorId, ActorType, KeyId};

use crate::error::Result;
use crate::recovery::{RecoveryOutcome, RecoveryRequest};

/// Answer to a key generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGenerationDecision {
    /// Mint a new keypair.
    Allow,
    /// Do not mint; the session continues without a new key.
    Deny {
        /// Why generation was refused.
        reason: String,
    },
    /// Postpone the decision.
    Defer {
        /// What the decision is waiting on.
        reason: String,
    },
}

impl KeyGenerationDecision {
    /// Whether generation may proceed now.
    pub fn is_allowed(&self) -> bool {
        matches!(self, KeyGenerationDecision::Allow)
    }
}

/// Decision engine the encrypted runtime consults.
///
/// Every method is synchronous and must not mutate shared state: the
/// runtime may call them from any thread, concurrently for different
/// actors, inside its bootstrap critical path.
pub trait KeyTrustPolicy: Send + Sync {
    /// Recover missing private keys.
    ///
    /// Returned fingerprints must all have been requested. Keys that
    /// cannot be recovered are omitted, never reported as errors.
    fn recover_keys(
        &self,
        requests: &[RecoveryRequest],
    ) -> Result<HashMap<ActorId, RecoveryOutcome>>;

    /// Decide whether a new keypair may be generated for `actor`.
    fn generate_key_for_owner(&self, actor: &Actor) -> Result<KeyGenerationDecision>;

    /// Filter the public keys a delegate claims.
    ///
    /// The result is an order-preserving subsequence of `candidates`.
    fn verify_delegate_public_keys(
        &self,
        delegate: &Actor,
        candidates: &[KeyId],
    ) -> Result<Vec<KeyId>>;

    /// Whether delegations toward `actor` must omit its identity.
    fn requires_anonymous_delegation(&self, actor: &Actor) -> bool;
}

/// Every actor except the professional type requires anonymous delegation.
pub fn requires_anonymity(actor_type: ActorType) -> bool {
    actor_type != ActorType::Hcp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymity_exhaustive() {
        for t in ActorType::ALL {
            assert_eq!(requires_anonymity(t), t != ActorType::Hcp, "{:?}", t);
        }
    }

    #[test]
    fn test_decision_is_allowed() {
        assert!(KeyGenerationDecision::Allow.is_allowed());
        assert!(!KeyGenerationDecision::Deny { reason: "no".into() }.is_allowed());
        assert!(!KeyGenerationDecision::Defer { reason: "later".into() }.is_allowed());
    }
}
