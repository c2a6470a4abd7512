//! A partitioned-log broker client: the transport between the producer,
//! which hands off confirmed-persisted notifications, and the consumer pool,
//! which pulls them back out for delivery.

pub mod kafka;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use notifier_common::{BrokerError, Notification};

/// A notification pulled off the broker, along with whatever handle the
/// implementation needs to acknowledge it once delivery is attempted.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub notification: Notification,
    offset: Offset,
}

impl Delivered {
    #[must_use]
    pub const fn new(notification: Notification, offset: Offset) -> Self {
        Self { notification, offset }
    }

    #[must_use]
    pub const fn offset(&self) -> &Offset {
        &self.offset
    }
}

/// Opaque position marker used to acknowledge a consumed message. Kafka-backed
/// implementations wrap a partition/offset pair; the in-memory implementation
/// wraps a simple sequence number.
#[derive(Debug, Clone)]
pub enum Offset {
    Kafka { partition: i32, offset: i64 },
    Sequence(u64),
}

/// Publishes notifications onto the broker.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Publishes a single notification with `acks=all` semantics: the call
    /// only returns `Ok` once the broker has durably accepted the record.
    ///
    /// # Errors
    /// Returns [`BrokerError::Enqueue`] if the broker rejects or times out
    /// the send.
    async fn publish(&self, notification: &Notification) -> Result<(), BrokerError>;
}

/// Pulls notifications back off the broker for delivery.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Waits up to `timeout` for the next message. Returns `Ok(None)` on a
    /// timeout, which callers should treat as "nothing to do this tick", not
    /// an error.
    ///
    /// # Errors
    /// Returns [`BrokerError::Poll`] on a non-timeout transport failure.
    async fn poll(&self, timeout: Duration) -> Result<Option<Delivered>, BrokerError>;

    /// Commits a message's offset, marking it as processed. Must only be
    /// called after the delivery attempt (successful or not) has been
    /// durably recorded in the store, to preserve at-least-once delivery.
    ///
    /// # Errors
    /// Returns [`BrokerError::Poll`] if the commit itself fails.
    async fn commit(&self, delivered: &Delivered) -> Result<(), BrokerError>;
}
