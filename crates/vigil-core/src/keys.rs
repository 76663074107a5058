//! Key identifiers, fingerprints, and exported key material.
//!
//! Public keys are referred to by their full identifier (the hex encoding
//! of the SPKI structure in practice). Recovered material is indexed by a
//! fingerprint: the last [`FINGERPRINT_LEN`] characters of that identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Number of trailing identifier characters that form a fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Full identifier of a public key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyId(String);

impl KeyId {
    /// Wrap an identifier, rejecting empty strings.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidKeyId("empty key identifier".into()));
        }
        Ok(Self(id))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The short fingerprint of this key.
    ///
    /// Identifiers shorter than [`FINGERPRINT_LEN`] are their own fingerprint.
    pub fn fingerprint(&self) -> KeyFingerprint {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(FINGERPRINT_LEN - 1)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        KeyFingerprint(self.0[start..].to_string())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId(..{})", self.fingerprint().as_str())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Short, stable identifier of a keypair within one actor's key set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    /// Get the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// RSA padding scheme a private key must be used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RsaEncryptionAlgorithm {
    /// RSA-OAEP with SHA-1 (legacy keys).
    OaepWithSha1,
    /// RSA-OAEP with SHA-256.
    OaepWithSha256,
}

/// A raw private key payload and the algorithm it belongs to.
///
/// Handed to the runtime by value. The bytes never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportedKeyMaterial {
    /// PKCS#8 private key bytes.
    pub private_key: Vec<u8>,

    /// Algorithm the key must be used with.
    pub algorithm: RsaEncryptionAlgorithm,
}

impl ExportedKeyMaterial {
    /// Create new exported material.
    pub fn new(private_key: Vec<u8>, algorithm: RsaEncryptionAlgorithm) -> Self {
        Self {
            private_key,
            algorithm,
        }
    }
}

impl fmt::Debug for ExportedKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedKeyMaterial")
            .field("private_key", &format_args!("<{} bytes>", self.private_key.len()))
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_last_32_chars() {
        let id = format!("{}{}", "a".repeat(40), "b".repeat(32));
        let key = KeyId::new(id).unwrap();

        assert_eq!(key.fingerprint().as_str(), "b".repeat(32));
    }

    #[test]
    fn test_short_key_is_own_fingerprint() {
        let key = KeyId::new("abc123").unwrap();
        assert_eq!(key.fingerprint().as_str(), "abc123");
    }

    #[test]
    fn test_exact_length_key() {
        let id = "c".repeat(FINGERPRINT_LEN);
        let key = KeyId::new(id.clone()).unwrap();
        assert_eq!(key.fingerprint().as_str(), id);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(KeyId::new("").is_err());
    }

    #[test]
    fn test_material_debug_is_redacted() {
        let material =
            ExportedKeyMaterial::new(vec![1, 2, 3, 4], RsaEncryptionAlgorithm::OaepWithSha1);
        let rendered = format!("{:?}", material);

        assert!(rendered.contains("<4 bytes>"));
        assert!(!rendered.contains("[1, 2, 3, 4]"));
    }
}
