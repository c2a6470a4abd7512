//! In-memory broker, used by tests to exercise the dispatcher without a real
//! Kafka cluster.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use notifier_common::{BrokerError, Notification};
use tokio::sync::{Mutex, Notify};

use crate::{Consumer, Delivered, Offset, Producer};

#[derive(Debug, Default)]
struct Inner {
    queue: Mutex<VecDeque<Notification>>,
    notify: Notify,
    next_seq: AtomicU64,
    published: AtomicU64,
}

/// A single-topic, single-partition broker backed by an in-process queue.
///
/// [`MemoryBroker::producer`] and [`MemoryBroker::consumer`] hand out
/// cheaply-cloneable handles that share the same underlying queue, mirroring
/// how a real broker's producer and consumer are independent clients against
/// the same topic.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer { inner: self.inner.clone() }
    }

    #[must_use]
    pub fn consumer(&self) -> MemoryConsumer {
        MemoryConsumer { inner: self.inner.clone() }
    }

    /// Total number of messages ever published, for test assertions.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryProducer {
    inner: Arc<Inner>,
}

#[async_trait]
impl Producer for MemoryProducer {
    async fn publish(&self, notification: &Notification) -> Result<(), BrokerError> {
        self.inner.queue.lock().await.push_back(notification.clone());
        self.inner.published.fetch_add(1, Ordering::SeqCst);
        self.inner.notify.notify_one();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConsumer {
    inner: Arc<Inner>,
}

#[async_trait]
impl Consumer for MemoryConsumer {
    async fn poll(&self, timeout: Duration) -> Result<Option<Delivered>, BrokerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(notification) = self.inner.queue.lock().await.pop_front() {
                let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
                return Ok(Some(Delivered::new(notification, Offset::Sequence(seq))));
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            tokio::select! {
                () = self.inner.notify.notified() => {}
                () = tokio::time::sleep(remaining) => return Ok(None),
            }
        }
    }

    async fn commit(&self, _delivered: &Delivered) -> Result<(), BrokerError> {
        // Messages are removed from the queue at poll time; nothing further
        // to acknowledge for this in-memory implementation.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use notifier_common::{DeliveryType, NotificationStatus};
    use uuid::Uuid;

    use super::*;

    fn sample() -> Notification {
        Notification {
            id: Uuid::new_v4(),
            delivery_type: DeliveryType::Sms,
            recipient: "+15555550123".to_string(),
            content: "your code is 1234".to_string(),
            status: NotificationStatus::InQueue,
            retries: 0,
            created_at: chrono::Utc::now(),
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn publish_then_poll_round_trips() {
        let broker = MemoryBroker::new();
        let producer = broker.producer();
        let consumer = broker.consumer();

        let notification = sample();
        producer.publish(&notification).await.unwrap();

        let delivered = consumer
            .poll(Duration::from_millis(100))
            .await
            .unwrap()
            .expect("expected a message");
        assert_eq!(delivered.notification.id, notification.id);
        consumer.commit(&delivered).await.unwrap();
    }

    #[tokio::test]
    async fn poll_times_out_on_empty_queue() {
        let broker = MemoryBroker::new();
        let consumer = broker.consumer();
        let result = consumer.poll(Duration::from_millis(20)).await.unwrap();
        assert!(result.is_none());
    }
}
