//! The default policy.

use std::collections::HashMap;

use vigil_core::{Actor, ActorId, KeyId};

use crate::error::Result;
use crate::policy::{requires_anonymity, KeyGenerationDecision, KeyTrustPolicy};
use crate::recovery::{recover_from_store, RecoveryOutcome, RecoveryRequest};
use crate::store::LocalKeyStore;

/// Recovers from local secrets, allows generation, accepts every delegate key.
///
/// Never returns an error for well-formed input.
#[derive(Debug, Clone, Default)]
pub struct PermissivePolicy {
    store: LocalKeyStore,
}

impl PermissivePolicy {
    /// Create a policy backed by `store`.
    pub fn new(store: LocalKeyStore) -> Self {
        Self { store }
    }
}

impl KeyTrustPolicy for PermissivePolicy {
    fn recover_keys(
        &self,
        requests: &[RecoveryRequest],
    ) -> Result<HashMap<ActorId, RecoveryOutcome>> {
        Ok(recover_from_store(&self.store, requests))
    }

    fn generate_key_for_owner(&self, _actor: &Actor) -> Result<KeyGenerationDecision> {
        Ok(KeyGenerationDecision::Allow)
    }

    fn verify_delegate_public_keys(
        &self,
        _delegate: &Actor,
        candidates: &[KeyId],
    ) -> Result<Vec<KeyId>> {
        Ok(candidates.to_vec())
    }

    fn requires_anonymous_delegation(&self, actor: &Actor) -> bool {
        requires_anonymity(actor.actor_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vigil_core::{ActorType, RsaEncryptionAlgorithm};

    const KEY_256: &str = "30820122300d06092a864886f70d01010105000382010f003082010a0282010100aa11";
    const KEY_1: &str = "30820122300d06092a864886f70d01010105000382010f003082010a0282010100bb22";

    fn key(s: &str) -> KeyId {
        KeyId::new(s).unwrap()
    }

    fn policy() -> PermissivePolicy {
        PermissivePolicy::new(LocalKeyStore::new(BTreeMap::from([
            (KEY_256.to_string(), "AQID".to_string()),
            (KEY_1.to_string(), "BAUG".to_string()),
        ])))
    }

    fn hcp() -> Actor {
        Actor::new(ActorId::new("hcp-1"), ActorType::Hcp)
            .with_key(key(KEY_256), RsaEncryptionAlgorithm::OaepWithSha256)
            .with_key(key(KEY_1), RsaEncryptionAlgorithm::OaepWithSha1)
    }

    #[test]
    fn test_recover_tags_algorithm_and_trust() {
        let request = RecoveryRequest::new(hcp(), vec![key(KEY_256), key(KEY_1)]);
        let result = policy().recover_keys(&[request]).unwrap();

        let outcome = &result[&ActorId::new("hcp-1")];
        assert_eq!(outcome.len(), 2);

        let k256 = outcome.get(&key(KEY_256).fingerprint()).unwrap();
        assert_eq!(k256.material.algorithm, RsaEncryptionAlgorithm::OaepWithSha256);
        assert_eq!(k256.material.private_key, vec![1, 2, 3]);
        assert!(k256.trusted);

        let k1 = outcome.get(&key(KEY_1).fingerprint()).unwrap();
        assert_eq!(k1.material.algorithm, RsaEncryptionAlgorithm::OaepWithSha1);
        assert_eq!(outcome.trusted_fingerprints().count(), 2);
    }

    #[test]
    fn test_recover_omits_unknown_keys() {
        let request = RecoveryRequest::new(hcp(), vec![key("deadbeef"), key(KEY_1)]);
        let result = policy().recover_keys(&[request]).unwrap();

        let outcome = &result[&ActorId::new("hcp-1")];
        assert_eq!(outcome.len(), 1);
        assert!(outcome.get(&key("deadbeef").fingerprint()).is_none());
    }

    #[test]
    fn test_recover_with_empty_store() {
        let request = RecoveryRequest::new(hcp(), vec![key(KEY_1)]);
        let result = PermissivePolicy::default().recover_keys(&[request]).unwrap();

        assert!(result[&ActorId::new("hcp-1")].is_empty());
    }

    #[test]
    fn test_recover_is_idempotent() {
        let requests = vec![RecoveryRequest::new(hcp(), vec![key(KEY_256)])];
        let policy = policy();

        assert_eq!(
            policy.recover_keys(&requests).unwrap(),
            policy.recover_keys(&requests).unwrap()
        );
    }

    #[test]
    fn test_generation_always_allowed() {
        let decision = policy().generate_key_for_owner(&hcp()).unwrap();
        assert_eq!(decision, KeyGenerationDecision::Allow);
    }

    #[test]
    fn test_delegate_keys_accepted_unchanged() {
        let candidates = vec![key("k3"), key("k1"), key("k2")];
        let accepted = policy().verify_delegate_public_keys(&hcp(), &candidates).unwrap();
        assert_eq!(accepted, candidates);
    }

    #[test]
    fn test_anonymous_delegation() {
        let policy = policy();
        assert!(!policy.requires_anonymous_delegation(&hcp()));
        let patient = Actor::new(ActorId::new("p"), ActorType::Patient);
        let device = Actor::new(ActorId::new("d"), ActorType::Device);
        assert!(policy.requires_anonymous_delegation(&patient));
        assert!(policy.requires_anonymous_delegation(&device));
    }
}
