//! Key recovery requests and outcomes.
//!
//! At session bootstrap the runtime asks, per actor, for the private keys
//! it could not find locally. The outcome maps fingerprints to recovered
//! material. Keys that cannot be recovered are simply absent.

use std::collections::{BTreeMap, HashMap};

use vigil_core::{Actor, ActorId, ExportedKeyMaterial, KeyFingerprint, KeyId};

use crate::store::LocalKeyStore;

/// One actor whose local key set is incomplete.
#[derive(Debug, Clone)]
pub struct RecoveryRequest {
    /// The actor as known to the runtime.
    pub actor: Actor,

    /// Full identifiers of the keys missing locally.
    pub unavailable_keys: Vec<KeyId>,
}

impl RecoveryRequest {
    /// Create a recovery request.
    pub fn new(actor: Actor, unavailable_keys: Vec<KeyId>) -> Self {
        Self {
            actor,
            unavailable_keys,
        }
    }
}

/// A recovered private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    /// The material, tagged with its algorithm.
    pub material: ExportedKeyMaterial,

    /// Whether the policy vouches for the key's provenance.
    pub trusted: bool,
}

/// Recovered keys for one actor, by fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryOutcome {
    /// Recovered keys.
    pub keys: BTreeMap<KeyFingerprint, RecoveredKey>,
}

impl RecoveryOutcome {
    /// Number of recovered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing was recovered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Recovered key for a fingerprint.
    pub fn get(&self, fingerprint: &KeyFingerprint) -> Option<&RecoveredKey> {
        self.keys.get(fingerprint)
    }

    /// Fingerprints whose keys are trusted.
    pub fn trusted_fingerprints(&self) -> impl Iterator<Item = &KeyFingerprint> {
        self.keys
            .iter()
            .filter(|(_, k)| k.trusted)
            .map(|(fp, _)| fp)
    }
}

/// Recover every requested key available in `store`.
///
/// Material is tagged with the algorithm the actor declares for the key
/// and marked trusted, since it comes from a pre-shared secret. Pure and
/// idempotent.
pub fn recover_from_store(
    store: &LocalKeyStore,
    requests: &[RecoveryRequest],
) -> HashMap<ActorId, RecoveryOutcome> {
    let mut result = HashMap::with_capacity(requests.len());

    for request in requests {
        let outcome: &mut RecoveryOutcome = result.entry(request.actor.id.clone()).or_default();

        for key in &request.unavailable_keys {
            let Some(private_key) = store.lookup(key) else {
                continue;
            };
            let algorithm = request.actor.algorithm_for(key);
            outcome.keys.insert(
                key.fingerprint(),
                RecoveredKey {
                    material: ExportedKeyMaterial::new(private_key, algorithm),
                    trusted: true,
                },
            );
        }

        tracing::debug!(
            actor = %request.actor.id,
            requested = request.unavailable_keys.len(),
            recovered = outcome.len(),
            "key recovery evaluated"
        );
    }

    result
}
