//! `rdkafka`-backed [`Producer`]/[`Consumer`] implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_common::{BrokerConfig, BrokerError, DeliveryType, Notification, NotificationStatus};
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::Message as _,
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Consumer, Delivered, Offset, Producer};

/// Wire format published to the topic. Kept distinct from [`Notification`] so
/// the broker payload shape can evolve independently of the storage schema,
/// but carries the full set of §3 attributes so nothing is lost in transit —
/// in particular `created_at`, which the consumer's delivery-latency metric
/// is computed from.
#[derive(Debug, Serialize, Deserialize)]
struct WireNotification {
    id: Uuid,
    delivery_type: String,
    recipient: String,
    content: String,
    status: NotificationStatus,
    retries: u8,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl From<&Notification> for WireNotification {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            delivery_type: n.delivery_type.to_string(),
            recipient: n.recipient.clone(),
            content: n.content.clone(),
            status: n.status,
            retries: n.retries,
            created_at: n.created_at,
            sent_at: n.sent_at,
        }
    }
}

impl WireNotification {
    fn into_notification(self) -> Notification {
        Notification {
            id: self.id,
            delivery_type: DeliveryType::from(self.delivery_type),
            recipient: self.recipient,
            content: self.content,
            status: self.status,
            retries: self.retries,
            created_at: self.created_at,
            sent_at: self.sent_at,
        }
    }
}

/// Kafka producer side of the broker client.
pub struct KafkaProducer {
    producer: FutureProducer,
    topic: String,
    request_timeout: Duration,
}

impl KafkaProducer {
    /// Connects a producer configured for durability (`acks=all`,
    /// idempotence enabled) rather than throughput.
    ///
    /// # Errors
    /// Returns [`BrokerError::Connect`] if the client cannot be constructed.
    pub fn connect(config: &BrokerConfig, request_timeout: Duration) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("retries", "5")
            .set("retry.backoff.ms", "500")
            .create()
            .map_err(|e| BrokerError::Connect(e.into()))?;

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            request_timeout,
        })
    }
}

#[async_trait]
impl Producer for KafkaProducer {
    async fn publish(&self, notification: &Notification) -> Result<(), BrokerError> {
        let payload = serde_json::to_vec(&WireNotification::from(notification))
            .map_err(|e| BrokerError::Enqueue(e.into()))?;
        let key = notification.id.to_string();

        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);

        self.producer
            .send(record, Timeout::After(self.request_timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| BrokerError::Enqueue(e.into()))
    }
}

/// Kafka consumer side of the broker client.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    /// Joins the configured consumer group with manual offset commits, so a
    /// crash between poll and store-write is re-delivered rather than lost.
    ///
    /// # Errors
    /// Returns [`BrokerError::Connect`] if the client cannot be constructed
    /// or the topic subscription fails.
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.bootstrap_servers)
            .set("group.id", &config.consumer_group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", "30000")
            .create()
            .map_err(|e| BrokerError::Connect(e.into()))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| BrokerError::Connect(e.into()))?;

        Ok(Self { consumer })
    }

    /// Commits past an unusable message (no payload, or one that failed to
    /// decode) so it is never redelivered.
    fn skip_message(&self, message: &rdkafka::message::BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.commit_message(message, CommitMode::Async) {
            tracing::error!(error = %e, "failed to commit offset past unusable message");
        }
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    async fn poll(&self, timeout: Duration) -> Result<Option<Delivered>, BrokerError> {
        let message = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => return Err(BrokerError::Poll(e.into())),
            Err(_) => return Ok(None),
        };

        let Some(payload) = message.payload() else {
            // No payload; nothing to deliver, but still an offset to advance past.
            self.skip_message(&message);
            return Ok(None);
        };

        let wire: WireNotification = match serde_json::from_slice(payload) {
            Ok(wire) => wire,
            Err(e) => {
                // A poison message that will never parse must not be retried
                // forever: log and advance past it rather than returning an
                // error, which would leave the offset uncommitted and the
                // consumer stuck replaying it.
                tracing::error!(error = %e, "failed to decode notification payload, skipping");
                self.skip_message(&message);
                return Ok(None);
            }
        };

        let offset = Offset::Kafka {
            partition: message.partition(),
            offset: message.offset(),
        };

        Ok(Some(Delivered::new(wire.into_notification(), offset)))
    }

    async fn commit(&self, delivered: &Delivered) -> Result<(), BrokerError> {
        let Offset::Kafka { .. } = delivered.offset() else {
            return Err(BrokerError::Poll(anyhow::anyhow!(
                "expected a Kafka offset, got an in-memory sequence number"
            )));
        };

        self.consumer
            .commit_consumer_state(CommitMode::Async)
            .or_else(|e| match e {
                rdkafka::error::KafkaError::ConsumerCommit(
                    rdkafka::types::RDKafkaErrorCode::NoOffset,
                ) => Ok(()),
                other => Err(other),
            })
            .map_err(|e| BrokerError::Poll(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use notifier_common::DeliveryType;

    use super::*;

    #[test]
    fn wire_round_trip_preserves_created_at_and_status() {
        let notification = Notification {
            id: Uuid::new_v4(),
            delivery_type: DeliveryType::Email,
            recipient: "a@b.com".to_string(),
            content: "hi".to_string(),
            status: NotificationStatus::InQueue,
            retries: 2,
            created_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            sent_at: None,
        };

        let bytes = serde_json::to_vec(&WireNotification::from(&notification)).unwrap();
        let wire: WireNotification = serde_json::from_slice(&bytes).unwrap();
        let round_tripped = wire.into_notification();

        assert_eq!(round_tripped.created_at, notification.created_at);
        assert_eq!(round_tripped.status, notification.status);
        assert_eq!(round_tripped.retries, notification.retries);
        assert_eq!(round_tripped.sent_at, notification.sent_at);
    }
}
