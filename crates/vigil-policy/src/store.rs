//! Local secrets used to recover lost private keys.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use vigil_core::KeyId;

/// Read-only mapping of full key identifier to base64 private key.
///
/// Supplied at construction and never mutated, so lookups need no locking
/// and the store can be shared across threads freely.
#[derive(Clone, Default)]
pub struct LocalKeyStore {
    keys: BTreeMap<String, String>,
}

impl LocalKeyStore {
    /// Create a store from an identifier → base64 mapping.
    pub fn new(keys: BTreeMap<String, String>) -> Self {
        Self { keys }
    }

    /// An empty store; nothing is recoverable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store holding a single pre-shared key pair, if both halves are given.
    pub fn from_pair(public_key: Option<String>, private_key: Option<String>) -> Self {
        match (public_key, private_key) {
            (Some(public), Some(private)) => Self::new(BTreeMap::from([(public, private)])),
            _ => Self::empty(),
        }
    }

    /// Add `keys`, replacing any existing entry for the same identifier.
    pub fn with_keys(mut self, keys: BTreeMap<String, String>) -> Self {
        self.keys.extend(keys);
        self
    }

    /// Number of configured keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether a secret is configured for `key`.
    pub fn contains(&self, key: &KeyId) -> bool {
        self.keys.contains_key(key.as_str())
    }

    /// Decoded private key bytes for `key`.
    ///
    /// Malformed base64 is logged and treated as absent.
    pub fn lookup(&self, key: &KeyId) -> Option<Vec<u8>> {
        let encoded = self.keys.get(key.as_str())?;
        match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(
                    fingerprint = %key.fingerprint(),
                    error = %e,
                    "ignoring malformed local key material"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for LocalKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyStore")
            .field("keys", &self.keys.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> KeyId {
        KeyId::new(s).unwrap()
    }

    fn store_with(id: &str, material: &str) -> LocalKeyStore {
        LocalKeyStore::new(BTreeMap::from([(id.to_string(), material.to_string())]))
    }

    #[test]
    fn test_lookup_decodes_base64() {
        let store = store_with("pk", "AQIDBA==");

        assert_eq!(store.lookup(&key("pk")), Some(vec![1, 2, 3, 4]));
        assert_eq!(store.lookup(&key("other")), None);
    }

    #[test]
    fn test_malformed_material_is_absent() {
        let store = store_with("pk", "not base64!");

        assert!(store.contains(&key("pk")));
        assert_eq!(store.lookup(&key("pk")), None);
    }

    #[test]
    fn test_from_pair_requires_both_halves() {
        let pair = LocalKeyStore::from_pair(Some("pk".into()), Some("AQ==".into()));
        assert_eq!(pair.len(), 1);
        assert!(LocalKeyStore::from_pair(Some("pk".into()), None).is_empty());
        assert!(LocalKeyStore::from_pair(None, Some("AQ==".into())).is_empty());
    }

    #[test]
    fn test_with_keys_overrides_pair() {
        let store = LocalKeyStore::from_pair(Some("pk".into()), Some("AQ==".into()))
            .with_keys(BTreeMap::from([
                ("pk".to_string(), "Ag==".to_string()),
                ("other".to_string(), "Aw==".to_string()),
            ]));

        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup(&key("pk")), Some(vec![2]));
        assert_eq!(store.lookup(&key("other")), Some(vec![3]));
    }

    #[test]
    fn test_debug_hides_material() {
        let store = store_with("pk", "AQIDBA==");
        assert!(!format!("{:?}", store).contains("AQIDBA=="));
    }
}
