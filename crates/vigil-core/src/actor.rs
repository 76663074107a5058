//! Data owners participating in the encrypted system.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keys::{KeyId, RsaEncryptionAlgorithm};

/// Identifier of a data owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    /// Create a new actor identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of data owner, which decides its delegation requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorType {
    /// Healthcare party: the professional or organizational actor.
    Hcp,
    /// A patient.
    Patient,
    /// A device acting on its own behalf.
    Device,
}

impl ActorType {
    /// All actor types.
    pub const ALL: [ActorType; 3] = [ActorType::Hcp, ActorType::Patient, ActorType::Device];
}

/// A data owner as seen by a trust decision.
///
/// Owned by the runtime; immutable for the duration of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier.
    pub id: ActorId,

    /// Delegation class.
    pub actor_type: ActorType,

    /// Public keys valid for RSA-OAEP with SHA-1.
    pub public_keys_for_oaep_with_sha1: BTreeSet<KeyId>,

    /// Public keys valid for RSA-OAEP with SHA-256.
    pub public_keys_for_oaep_with_sha256: BTreeSet<KeyId>,
}

impl Actor {
    /// Create an actor with no known public keys.
    pub fn new(id: ActorId, actor_type: ActorType) -> Self {
        Self {
            id,
            actor_type,
            public_keys_for_oaep_with_sha1: BTreeSet::new(),
            public_keys_for_oaep_with_sha256: BTreeSet::new(),
        }
    }

    /// Add a public key under the given scheme.
    pub fn with_key(mut self, key: KeyId, algorithm: RsaEncryptionAlgorithm) -> Self {
        match algorithm {
            RsaEncryptionAlgorithm::OaepWithSha1 => {
                self.public_keys_for_oaep_with_sha1.insert(key);
            }
            RsaEncryptionAlgorithm::OaepWithSha256 => {
                self.public_keys_for_oaep_with_sha256.insert(key);
            }
        }
        self
    }

    /// The algorithm a private key for `key` must be used with.
    ///
    /// SHA-256 only when the key is declared in the SHA-256 set; every
    /// other key, known or not, defaults to SHA-1.
    pub fn algorithm_for(&self, key: &KeyId) -> RsaEncryptionAlgorithm {
        if self.public_keys_for_oaep_with_sha256.contains(key) {
            RsaEncryptionAlgorithm::OaepWithSha256
        } else {
            RsaEncryptionAlgorithm::OaepWithSha1
        }
    }

    /// Whether the actor declares `key` under any scheme.
    pub fn declares(&self, key: &KeyId) -> bool {
        self.public_keys_for_oaep_with_sha1.contains(key)
            || self.public_keys_for_oaep_with_sha256.contains(key)
    }

    /// Iterate over every declared key, SHA-1 set first.
    pub fn all_keys(&self) -> impl Iterator<Item = &KeyId> {
        self.public_keys_for_oaep_with_sha1
            .iter()
            .chain(self.public_keys_for_oaep_with_sha256.iter())
    }
}
