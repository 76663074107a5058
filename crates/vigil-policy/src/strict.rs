//! A conservative policy for deployments where keys are provisioned out of band.

use std::collections::HashMap;

use vigil_core::{Actor, ActorId, KeyId};

use crate::error::Result;
use crate::policy::{requires_anonymity, KeyGenerationDecision, KeyTrustPolicy};
use crate::recovery::{recover_from_store, RecoveryOutcome, RecoveryRequest};
use crate::store::LocalKeyStore;

/// Recovers from local secrets, never mints keys, and only accepts
/// delegate keys the delegate itself declares.
#[derive(Debug, Clone, Default)]
pub struct StrictPolicy {
    store: LocalKeyStore,
}

impl StrictPolicy {
    /// Create a policy backed by `store`.
    pub fn new(store: LocalKeyStore) -> Self {
        Self { store }
    }
}

impl KeyTrustPolicy for StrictPolicy {
    fn recover_keys(
        &self,
        requests: &[RecoveryRequest],
    ) -> Result<HashMap<ActorId, RecoveryOutcome>> {
        Ok(recover_from_store(&self.store, requests))
    }

    fn generate_key_for_owner(&self, actor: &Actor) -> Result<KeyGenerationDecision> {
        tracing::info!(actor = %actor.id, "refusing key generation");
        Ok(KeyGenerationDecision::Deny {
            reason: format!("key generation disabled for {}", actor.id),
        })
    }

    fn verify_delegate_public_keys(
        &self,
        delegate: &Actor,
        candidates: &[KeyId],
    ) -> Result<Vec<KeyId>> {
        let accepted: Vec<KeyId> = candidates
            .iter()
            .filter(|k| delegate.declares(k))
            .cloned()
            .collect();

        if accepted.len() < candidates.len() {
            tracing::warn!(
                delegate = %delegate.id,
                rejected = candidates.len() - accepted.len(),
                "rejected undeclared delegate keys"
            );
        }
        Ok(accepted)
    }

    fn requires_anonymous_delegation(&self, actor: &Actor) -> bool {
        requires_anonymity(actor.actor_type)
    }
}
