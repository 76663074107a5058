//! Capabilities Vigil requires from the encrypted runtime.
//!
//! The runtime owns transport, storage, and encryption. Vigil only
//! subscribes, decrypts, reads, and writes through these traits, so any
//! runtime (remote SDK, local replica, the in-memory one used in tests)
//! can drive the consumer.

use std::time::Duration;

use async_trait::async_trait;

use vigil_core::{Contact, Service};

use crate::error::RuntimeError;
use crate::event::{EntityRef, EventType, SubscriptionEvent};
use crate::filter::FilterExpression;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// A live subscription.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `None` if nothing arrived in time and
    /// [`RuntimeError::ChannelClosed`] once the subscription is gone.
    async fn poll(&self, timeout: Duration) -> Result<Option<SubscriptionEvent>>;
}

/// Operations of the encrypted runtime used by the consumer.
#[async_trait]
pub trait EncryptedRuntime: Send + Sync {
    /// Channel type returned by [`subscribe`](Self::subscribe).
    type Channel: EventChannel + 'static;

    /// Subscribe to changes of services matching `filter`.
    async fn subscribe(
        &self,
        filter: &FilterExpression,
        event_types: &[EventType],
    ) -> Result<Self::Channel>;

    /// Decrypt a delivered service.
    async fn decrypt(&self, entity: &EntityRef) -> Result<Service>;

    /// Read the latest revision of a contact.
    async fn fetch_latest(&self, container_id: &str) -> Result<Contact>;

    /// Write a full contact.
    ///
    /// Fails with [`RuntimeError::Conflict`] if `contact.rev` is stale.
    async fn update(&self, contact: Contact) -> Result<Contact>;
}
