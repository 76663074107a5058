//! Events delivered by a subscription.

use bytes::Bytes;

/// Kinds of change a subscription can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// An entity was created.
    Create,
    /// An entity was updated.
    Update,
    /// An entity was deleted.
    Delete,
}

/// Reference to an encrypted service delivered by a notification.
///
/// `sealed` is opaque to Vigil; only the runtime can open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    /// Identifier of the service.
    pub entity_id: String,

    /// Identifier of the containing contact.
    pub container_id: String,

    /// Encrypted payload.
    pub sealed: Bytes,
}

/// Something received from a subscription channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// A matching entity changed.
    Notification {
        /// Delivery identifier, used in logs.
        event_id: String,
        /// What kind of change.
        event_type: EventType,
        /// The changed entity, if the runtime attached one.
        entity: Option<EntityRef>,
    },

    /// Keep-alive from the runtime.
    Heartbeat,

    /// The runtime reported a problem on the stream.
    Error {
        /// Description from the runtime.
        message: String,
    },
}

