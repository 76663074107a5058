//! In-memory encrypted runtime.
//!
//! Keeps contacts in a map with a revision counter, seals every delivered
//! service with ChaCha20-Poly1305 under a per-runtime key, and fans
//! notifications out to subscriptions over channels. Used by tests and
//! local demos; has the same optimistic-concurrency semantics a real
//! runtime enforces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use tokio::sync::{mpsc, Mutex};

use vigil_core::{Contact, Service};

use crate::error::RuntimeError;
use crate::event::{EntityRef, EventType, SubscriptionEvent};
use crate::filter::FilterExpression;
use crate::runtime::{EncryptedRuntime, EventChannel, Result};

const NONCE_LEN: usize = 12;
const CHANNEL_CAPACITY: usize = 1000;

struct Subscriber {
    filter: FilterExpression,
    event_types: Vec<EventType>,
    sender: mpsc::Sender<SubscriptionEvent>,
}

#[derive(Default)]
struct Inner {
    contacts: HashMap<String, Contact>,
    revisions: HashMap<String, u64>,
    subscribers: Vec<Subscriber>,
    next_event: u64,
    pending_conflicts: u32,
    pending_transient: u32,
    update_count: u32,
}

/// An encrypted runtime that lives entirely in memory.
pub struct MemoryRuntime {
    cipher: ChaCha20Poly1305,
    inner: Mutex<Inner>,
}

impl MemoryRuntime {
    /// Create an empty runtime with a random sealing key.
    pub fn new() -> Arc<Self> {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Arc::new(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Store a new contact and notify matching subscriptions.
    pub async fn create_contact(&self, mut contact: Contact) -> Result<Contact> {
        let mut inner = self.inner.lock().await;
        if inner.contacts.contains_key(&contact.id) {
            return Err(RuntimeError::Conflict {
                container_id: contact.id.clone(),
                rev: contact.rev.clone(),
            });
        }

        contact.rev = Some(Self::bump(&mut inner, &contact.id));
        inner.contacts.insert(contact.id.clone(), contact.clone());
        self.notify(&mut inner, &contact, EventType::Create);
        Ok(contact)
    }

    /// Current stored version of a contact.
    pub async fn contact(&self, id: &str) -> Option<Contact> {
        self.inner.lock().await.contacts.get(id).cloned()
    }

    /// Number of successful updates so far.
    pub async fn update_count(&self) -> u32 {
        self.inner.lock().await.update_count
    }

    /// Make the next `count` updates fail as if another writer got there first.
    ///
    /// Each injected conflict also advances the stored revision, so a
    /// retry that does not re-read will keep failing.
    pub async fn inject_conflicts(&self, count: u32) {
        self.inner.lock().await.pending_conflicts = count;
    }

    /// Make the next `count` reads fail with a transient error.
    pub async fn inject_transient_failures(&self, count: u32) {
        self.inner.lock().await.pending_transient = count;
    }

    /// Deliver a notification for a stored service to every subscription,
    /// regardless of filters. Simulates duplicate delivery.
    pub async fn redeliver(&self, contact_id: &str, service_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let service = inner
            .contacts
            .get(contact_id)
            .and_then(|c| c.service(service_id))
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(format!("{}/{}", contact_id, service_id)))?;

        let entity = self.seal(&service)?;
        let event_id = Self::next_event_id(&mut inner);
        for sub in &inner.subscribers {
            Self::deliver(
                sub,
                SubscriptionEvent::Notification {
                    event_id: event_id.clone(),
                    event_type: EventType::Update,
                    entity: Some(entity.clone()),
                },
            );
        }
        Ok(())
    }

    /// Push a raw event to every subscription.
    pub async fn emit(&self, event: SubscriptionEvent) {
        let inner = self.inner.lock().await;
        for sub in &inner.subscribers {
            Self::deliver(sub, event.clone());
        }
    }

    /// Drop every subscription; their channels report closure once drained.
    pub async fn close(&self) {
        self.inner.lock().await.subscribers.clear();
    }

    /// Encrypt a service into an entity reference.
    pub fn seal(&self, service: &Service) -> Result<EntityRef> {
        let mut plaintext = Vec::new();
        ciborium::into_writer(service, &mut plaintext)
            .map_err(|e| RuntimeError::Fatal(format!("encode service: {}", e)))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|e| RuntimeError::Fatal(format!("seal service: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        Ok(EntityRef {
            entity_id: service.id.clone(),
            container_id: service.contact_id.clone(),
            sealed: Bytes::from(sealed),
        })
    }

    fn bump(inner: &mut Inner, id: &str) -> String {
        let rev = inner.revisions.entry(id.to_string()).or_insert(0);
        *rev += 1;
        rev.to_string()
    }

    fn next_event_id(inner: &mut Inner) -> String {
        inner.next_event += 1;
        format!("evt-{}", inner.next_event)
    }

    fn deliver(sub: &Subscriber, event: SubscriptionEvent) {
        if let Err(e) = sub.sender.try_send(event) {
            tracing::warn!(error = %e, "dropping event for subscription");
        }
    }

    fn notify(&self, inner: &mut Inner, contact: &Contact, event_type: EventType) {
        for service in &contact.services {
            let targets: Vec<usize> = inner
                .subscribers
                .iter()
                .enumerate()
                .filter(|(_, s)| s.event_types.contains(&event_type) && s.filter.matches(service))
                .map(|(i, _)| i)
                .collect();
            if targets.is_empty() {
                continue;
            }

            let entity = match self.seal(service) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::warn!(
                        service = %service.id,
                        error = %e,
                        "could not seal notification"
                    );
                    continue;
                }
            };
            for i in targets {
                let event_id = Self::next_event_id(inner);
                Self::deliver(
                    &inner.subscribers[i],
                    SubscriptionEvent::Notification {
                        event_id,
                        event_type,
                        entity: Some(entity.clone()),
                    },
                );
            }
        }
    }
}

#[async_trait]
impl EncryptedRuntime for MemoryRuntime {
    type Channel = MemoryChannel;

    async fn subscribe(
        &self,
        filter: &FilterExpression,
        event_types: &[EventType],
    ) -> Result<MemoryChannel> {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.inner.lock().await.subscribers.push(Subscriber {
            filter: filter.clone(),
            event_types: event_types.to_vec(),
            sender,
        });
        Ok(MemoryChannel {
            receiver: Mutex::new(receiver),
        })
    }

    async fn decrypt(&self, entity: &EntityRef) -> Result<Service> {
        if entity.sealed.len() <= NONCE_LEN {
            return Err(RuntimeError::Decryption(format!(
                "payload of {} too short",
                entity.entity_id
            )));
        }
        let (nonce, ciphertext) = entity.sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| RuntimeError::Decryption(format!("{}: {}", entity.entity_id, e)))?;

        ciborium::from_reader(plaintext.as_slice())
            .map_err(|e| RuntimeError::Decryption(format!("{}: {}", entity.entity_id, e)))
    }

    async fn fetch_latest(&self, container_id: &str) -> Result<Contact> {
        let mut inner = self.inner.lock().await;
        if inner.pending_transient > 0 {
            inner.pending_transient -= 1;
            return Err(RuntimeError::Transient(format!("read of {} timed out", container_id)));
        }
        inner
            .contacts
            .get(container_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(container_id.to_string()))
    }

    async fn update(&self, mut contact: Contact) -> Result<Contact> {
        let mut inner = self.inner.lock().await;

        if inner.pending_conflicts > 0 {
            inner.pending_conflicts -= 1;
            if let Some(stored) = inner.contacts.get(&contact.id).cloned() {
                let rev = Self::bump(&mut inner, &stored.id);
                if let Some(c) = inner.contacts.get_mut(&stored.id) {
                    c.rev = Some(rev);
                }
            }
            return Err(RuntimeError::Conflict {
                container_id: contact.id,
                rev: contact.rev,
            });
        }

        let stored_rev = inner
            .contacts
            .get(&contact.id)
            .ok_or_else(|| RuntimeError::NotFound(contact.id.clone()))?
            .rev
            .clone();
        if stored_rev != contact.rev {
            return Err(RuntimeError::Conflict {
                container_id: contact.id,
                rev: contact.rev,
            });
        }

        contact.rev = Some(Self::bump(&mut inner, &contact.id));
        inner.contacts.insert(contact.id.clone(), contact.clone());
        inner.update_count += 1;
        self.notify(&mut inner, &contact, EventType::Update);
        Ok(contact)
    }
}

/// Receiving end of a [`MemoryRuntime`] subscription.
pub struct MemoryChannel {
    receiver: Mutex<mpsc::Receiver<SubscriptionEvent>>,
}

#[async_trait]
impl EventChannel for MemoryChannel {
    async fn poll(&self, timeout: Duration) -> Result<Option<SubscriptionEvent>> {
        let mut rx = self.receiver.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(event)) => Ok(Some(event)),
            Ok(None) => Err(RuntimeError::ChannelClosed),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vigil_core::{CodeStub, Content};

    use crate::filter::TagFilterBuilder;

    fn contact(id: &str, value: f64) -> Contact {
        let mut content = BTreeMap::new();
        content.insert("en".to_string(), Content::measure(value, CodeStub::glucose_unit()));
        Contact {
            id: id.into(),
            rev: None,
            opening_date: Some(20240709105300),
            closing_date: Some(20240709105400),
            services: vec![Service {
                id: format!("{}-svc", id),
                contact_id: id.into(),
                value_date: Some(20240709105300),
                content,
                tags: vec![CodeStub::glucose_test(), CodeStub::pending_analysis()],
            }],
        }
    }

    fn pending_filter() -> FilterExpression {
        TagFilterBuilder::new().by_code(&CodeStub::pending_analysis()).build()
    }

    #[tokio::test]
    async fn test_seal_and_decrypt() {
        let runtime = MemoryRuntime::new();
        let service = contact("c1", 90.0).services.remove(0);

        let entity = runtime.seal(&service).unwrap();
        assert_eq!(entity.entity_id, "c1-svc");
        assert_eq!(entity.container_id, "c1");

        let opened = runtime.decrypt(&entity).await.unwrap();
        assert_eq!(opened, service);
    }

    #[tokio::test]
    async fn test_decrypt_with_other_runtime_fails() {
        let a = MemoryRuntime::new();
        let b = MemoryRuntime::new();
        let entity = a.seal(&contact("c1", 90.0).services[0]).unwrap();

        assert!(matches!(b.decrypt(&entity).await, Err(RuntimeError::Decryption(_))));
    }

    #[tokio::test]
    async fn test_create_notifies_matching_subscriptions() {
        let runtime = MemoryRuntime::new();
        let channel = runtime.subscribe(&pending_filter(), &[EventType::Create]).await.unwrap();

        runtime.create_contact(contact("c1", 90.0)).await.unwrap();

        let event = channel.poll(Duration::from_millis(50)).await.unwrap().unwrap();
        match event {
            SubscriptionEvent::Notification { event_type, entity, .. } => {
                assert_eq!(event_type, EventType::Create);
                assert_eq!(entity.unwrap().entity_id, "c1-svc");
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_matching_service_not_delivered() {
        let runtime = MemoryRuntime::new();
        let channel = runtime.subscribe(&pending_filter(), &[EventType::Create]).await.unwrap();

        let mut c = contact("c1", 90.0);
        c.services[0].tags.clear();
        runtime.create_contact(c).await.unwrap();

        assert!(channel.poll(Duration::from_millis(20)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_revision_rejected() {
        let runtime = MemoryRuntime::new();
        let created = runtime.create_contact(contact("c1", 90.0)).await.unwrap();
        assert_eq!(created.rev.as_deref(), Some("1"));

        let updated = runtime.update(created.clone()).await.unwrap();
        assert_eq!(updated.rev.as_deref(), Some("2"));

        let err = runtime.update(created).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Conflict { .. }));
        assert_eq!(runtime.update_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_conflict_advances_revision() {
        let runtime = MemoryRuntime::new();
        let created = runtime.create_contact(contact("c1", 90.0)).await.unwrap();
        runtime.inject_conflicts(1).await;

        assert!(runtime.update(created.clone()).await.is_err());
        // The stored revision moved on, so the old copy stays stale.
        assert!(runtime.update(created).await.is_err());

        let fresh = runtime.fetch_latest("c1").await.unwrap();
        assert!(runtime.update(fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_transient_failures() {
        let runtime = MemoryRuntime::new();
        runtime.create_contact(contact("c1", 90.0)).await.unwrap();
        runtime.inject_transient_failures(1).await;

        assert!(matches!(runtime.fetch_latest("c1").await, Err(RuntimeError::Transient(_))));
        assert!(runtime.fetch_latest("c1").await.is_ok());
        assert!(matches!(runtime.fetch_latest("nope").await, Err(RuntimeError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_close_ends_channel() {
        let runtime = MemoryRuntime::new();
        let channel = runtime.subscribe(&pending_filter(), &[EventType::Create]).await.unwrap();

        runtime.emit(SubscriptionEvent::Heartbeat).await;
        runtime.close().await;

        assert_eq!(
            channel.poll(Duration::from_millis(20)).await.unwrap(),
            Some(SubscriptionEvent::Heartbeat)
        );
        assert_eq!(
            channel.poll(Duration::from_millis(20)).await,
            Err(RuntimeError::ChannelClosed)
        );
    }
}
