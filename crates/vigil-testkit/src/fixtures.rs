//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use vigil_core::{
    Actor, ActorId, ActorType, CodeStub, Contact, Content, KeyId, RsaEncryptionAlgorithm, Service,
};
use vigil_events::MemoryRuntime;
use vigil_policy::LocalKeyStore;

/// DER prefix shared by 2048-bit RSA SubjectPublicKeyInfo encodings.
const SPKI_PREFIX: &str = "30820122300d06092a864886f70d01010105000382010f003082010a0282010100";

/// Timestamp used for contacts and services built here (YYYYMMDDhhmmss).
pub const FIXTURE_DATE: i64 = 20240709105300;

/// A public key identifier and the private key it pairs with.
#[derive(Debug, Clone)]
pub struct KeyPairFixture {
    pub public: KeyId,
    pub private: Vec<u8>,
}

impl KeyPairFixture {
    /// Deterministic pair from a seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(&mut StdRng::seed_from_u64(seed))
    }

    /// Random pair.
    pub fn generate() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    fn from_rng<R: RngCore>(rng: &mut R) -> Self {
        let mut modulus = [0u8; 64];
        rng.fill_bytes(&mut modulus);
        let mut private = vec![0u8; 48];
        rng.fill_bytes(&mut private);

        let public = format!("{}{}0203010001", SPKI_PREFIX, hex::encode(modulus));
        Self {
            public: KeyId::new(public).expect("generated key id is non-empty"),
            private,
        }
    }

    /// Private key as stored in configuration.
    pub fn private_base64(&self) -> String {
        STANDARD.encode(&self.private)
    }
}

/// Build a key store holding every given pair.
pub fn key_store(pairs: &[KeyPairFixture]) -> LocalKeyStore {
    LocalKeyStore::new(
        pairs
            .iter()
            .map(|p| (p.public.as_str().to_string(), p.private_base64()))
            .collect(),
    )
}

/// An actor declaring each key under the given algorithm.
pub fn actor_with_keys(
    id: &str,
    actor_type: ActorType,
    keys: &[(&KeyPairFixture, RsaEncryptionAlgorithm)],
) -> Actor {
    keys.iter().fold(
        Actor::new(ActorId::new(id), actor_type),
        |actor, (pair, algorithm)| actor.with_key(pair.public.clone(), *algorithm),
    )
}

/// A healthcare professional with one SHA-256 key.
pub fn hcp(id: &str, key: &KeyPairFixture) -> Actor {
    actor_with_keys(id, ActorType::Hcp, &[(key, RsaEncryptionAlgorithm::OaepWithSha256)])
}

/// A patient with one SHA-1 key.
pub fn patient(id: &str, key: &KeyPairFixture) -> Actor {
    actor_with_keys(id, ActorType::Patient, &[(key, RsaEncryptionAlgorithm::OaepWithSha1)])
}

/// A blood glucose service awaiting analysis.
pub fn glycemia_service(contact_id: &str, service_id: &str, value: f64) -> Service {
    let mut content = BTreeMap::new();
    content.insert("en".to_string(), Content::measure(value, CodeStub::glucose_unit()));
    Service {
        id: service_id.into(),
        contact_id: contact_id.into(),
        value_date: Some(FIXTURE_DATE),
        content,
        tags: vec![CodeStub::glucose_test(), CodeStub::pending_analysis()],
    }
}

/// A closed contact holding one glycemia service.
pub fn glycemia_contact(id: &str, value: f64) -> Contact {
    Contact {
        id: id.into(),
        rev: None,
        opening_date: Some(FIXTURE_DATE),
        closing_date: Some(FIXTURE_DATE + 100),
        services: vec![glycemia_service(id, &format!("{}-svc", id), value)],
    }
}

/// Move every service's content from its current locale(s) to `locale`.
pub fn relocalize(mut contact: Contact, locale: &str) -> Contact {
    for service in &mut contact.services {
        let content = std::mem::take(&mut service.content);
        if let Some((_, c)) = content.into_iter().next() {
            service.content.insert(locale.to_string(), c);
        }
    }
    contact
}

/// A memory runtime with helpers for recording observations.
pub struct TestFixture {
    pub runtime: Arc<MemoryRuntime>,
    next_contact: AtomicU32,
}

impl TestFixture {
    /// Create a fixture over an empty runtime.
    pub fn new() -> Self {
        Self {
            runtime: MemoryRuntime::new(),
            next_contact: AtomicU32::new(0),
        }
    }

    /// Store a new glycemia contact and return it as stored.
    pub async fn record_glycemia(&self, value: f64) -> Contact {
        let n = self.next_contact.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(glycemia_contact(&format!("ctc-{}", n), value)).await
    }

    /// Store an arbitrary contact.
    pub async fn record(&self, contact: Contact) -> Contact {
        self.runtime
            .create_contact(contact)
            .await
            .expect("fixture contact rejected")
    }

    /// Stored tags of a contact's first service.
    pub async fn tags(&self, contact_id: &str) -> Vec<CodeStub> {
        self.runtime
            .contact(contact_id)
            .await
            .and_then(|c| c.services.into_iter().next())
            .map(|s| s.tags)
            .unwrap_or_default()
    }

    /// Wait until the runtime has accepted `count` updates.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for_updates(&self, count: u32, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.runtime.update_count().await >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.runtime.update_count().await >= count
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create key pairs for multi-actor tests.
pub fn key_pairs(count: usize) -> Vec<KeyPairFixture> {
    (0..count as u64).map(KeyPairFixture::with_seed).collect()
}
