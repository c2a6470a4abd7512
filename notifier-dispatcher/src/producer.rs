//! The dispatcher: drains pending notifications from the store and publishes
//! them to the broker, marking them `InQueue` once the publish is confirmed.

use std::{sync::Arc, time::Duration};

use notifier_common::{Config, Signal};
use notifier_broker::Producer as BrokerProducer;
use notifier_store::Store;
use notifier_tracing::traced;
use uuid::Uuid;

/// Periodically drains up to `max_batch_size` pending notifications and
/// publishes each to the broker.
///
/// A notification is only marked `InQueue` after its publish has been
/// confirmed; if the process crashes between publish and the store update,
/// the next tick republishes it. Duplicates on the broker are expected and
/// tolerated by the consumer side (at-least-once, not exactly-once).
pub struct Dispatcher {
    store: Arc<dyn Store>,
    broker: Arc<dyn BrokerProducer>,
    max_batch_size: usize,
    tick_interval: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, broker: Arc<dyn BrokerProducer>, config: &Config) -> Self {
        Self {
            store,
            broker,
            max_batch_size: config.dispatcher.max_batch_size,
            tick_interval: config.dispatcher.producer_tick(),
        }
    }

    /// Runs one drain-and-publish cycle, returning the number of
    /// notifications successfully published and marked `InQueue`.
    #[traced(instrument(skip(self)))]
    pub async fn tick(&self) -> usize {
        let pending = match self.store.get_pending(self.max_batch_size).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to read pending notifications");
                return 0;
            }
        };

        if pending.is_empty() {
            return 0;
        }

        let mut published: Vec<Uuid> = Vec::with_capacity(pending.len());
        for notification in &pending {
            match self.broker.publish(notification).await {
                Ok(()) => {
                    published.push(notification.id);
                    if let Some(metrics) = notifier_metrics::metrics() {
                        metrics.record_published(notification.delivery_type.as_str(), 1);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        id = %notification.id,
                        error = %e,
                        "failed to publish notification, will retry next tick"
                    );
                }
            }
        }

        if published.is_empty() {
            return 0;
        }

        if let Err(e) = self.store.mark_in_queue(&published).await {
            tracing::error!(error = %e, "failed to mark published notifications in_queue");
        }

        published.len()
    }

    /// Runs the drain-and-publish loop until `shutdown` fires.
    pub async fn serve(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<Signal>) {
        tracing::info!("dispatcher starting");

        let mut timer = tokio::time::interval(self.tick_interval);
        timer.tick().await;

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let published = self.tick().await;
                    if published > 0 {
                        tracing::debug!(published, "dispatcher tick published notifications");
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) | Err(_) => {
                            tracing::info!("dispatcher received shutdown signal");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use notifier_broker::memory::MemoryBroker;
    use notifier_common::{
        BrokerConfig, Config, DispatcherConfig, NewNotification, NotificationStatus, SmtpConfig,
        StoreConfig,
    };
    use notifier_store::MemoryStore;

    use super::*;

    fn config() -> Config {
        Config {
            store: StoreConfig {
                database_dsn: String::new(),
                pool_size: 1,
            },
            broker: BrokerConfig {
                bootstrap_servers: String::new(),
                topic: "notifications".to_string(),
                consumer_group_id: "test".to_string(),
                partitions: 1,
            },
            dispatcher: DispatcherConfig {
                max_batch_size: 10,
                max_retries: 3,
                producer_tick_secs: 1,
                consumer_poll_timeout_secs: 1,
                request_timeout_secs: 1,
            },
            smtp: None::<SmtpConfig>,
            sms: None,
            telegram: None,
            http_bind: "127.0.0.1:0".to_string(),
            environment: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn tick_publishes_pending_and_marks_in_queue() {
        let store = Arc::new(MemoryStore::new());
        let broker = MemoryBroker::new();
        let producer = Arc::new(broker.producer());
        let consumer = broker.consumer();

        store
            .insert_batch(
                vec![NewNotification {
                    delivery_type: "email".into(),
                    recipient: "a@b.com".to_string(),
                    content: "hi".to_string(),
                }],
                10,
            )
            .await
            .unwrap();

        let dispatcher = Dispatcher::new(store.clone(), producer, &config());
        let published = dispatcher.tick().await;
        assert_eq!(published, 1);

        let delivered = consumer
            .poll(std::time::Duration::from_millis(10))
            .await
            .unwrap()
            .expect("a message should be queued");
        assert_eq!(delivered.notification.status, NotificationStatus::Pending);

        let stored = store.get_by_id(delivered.notification.id).await.unwrap();
        assert_eq!(stored.status, NotificationStatus::InQueue);
    }

    #[tokio::test]
    async fn tick_is_a_noop_when_nothing_pending() {
        let store = Arc::new(MemoryStore::new());
        let broker = MemoryBroker::new();
        let dispatcher = Dispatcher::new(store, Arc::new(broker.producer()), &config());
        assert_eq!(dispatcher.tick().await, 0);
    }
}
