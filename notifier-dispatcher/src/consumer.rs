//! The deliverer: pulls notifications back off the broker and attempts
//! delivery through the registered adapter, updating the store with the
//! outcome and committing the broker offset only once that update lands.

use std::sync::Arc;

use chrono::Utc;
use notifier_adapters::AdapterRegistry;
use notifier_broker::Consumer as BrokerConsumer;
use notifier_common::{Config, Signal};
use notifier_store::Store;
use notifier_tracing::traced;

/// Polls the broker for queued notifications and attempts one delivery per
/// message, bounded by `max_retries`.
///
/// A failed attempt re-queues the notification as `Pending` (incrementing its
/// retry count) so the dispatcher picks it up again on its next tick, unless
/// the retry bound has been reached, in which case it is marked `Failed`.
/// The broker offset is committed only after the store update succeeds, so a
/// crash between delivery and commit redelivers the message rather than
/// losing it.
pub struct Deliverer {
    store: Arc<dyn Store>,
    broker: Arc<dyn BrokerConsumer>,
    adapters: Arc<AdapterRegistry>,
    max_retries: u8,
    poll_timeout: std::time::Duration,
}

impl Deliverer {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        broker: Arc<dyn BrokerConsumer>,
        adapters: Arc<AdapterRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            broker,
            adapters,
            max_retries: config.dispatcher.max_retries,
            poll_timeout: config.dispatcher.consumer_poll_timeout(),
        }
    }

    /// Polls once and, if a message was available, attempts its delivery.
    /// Returns `true` if a message was processed (delivered, requeued, or
    /// failed out), `false` if the poll timed out with nothing to do.
    #[traced(instrument(skip(self)))]
    pub async fn tick(&self) -> bool {
        let delivered = match self.broker.poll(self.poll_timeout).await {
            Ok(Some(delivered)) => delivered,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(error = %e, "failed to poll broker");
                return false;
            }
        };

        let notification = &delivered.notification;
        let outcome = self.adapters.send(notification).await;

        // The retry counter is bumped on every attempt, not just failures, so
        // it records attempts made rather than failures (see `mark_delivered`).
        let next_retries = notification.retries.saturating_add(1);

        let store_result = match outcome {
            Ok(()) => {
                let sent_at = Utc::now();
                if let Some(metrics) = notifier_metrics::metrics() {
                    let latency = (sent_at - notification.created_at)
                        .to_std()
                        .unwrap_or_default()
                        .as_secs_f64();
                    metrics.record_delivered(notification.delivery_type.as_str(), latency, next_retries);
                }
                self.store.mark_delivered(notification.id, sent_at, next_retries).await
            }
            Err(ref e) => {
                if next_retries > self.max_retries {
                    tracing::warn!(
                        id = %notification.id,
                        retries = next_retries,
                        error = %e,
                        "delivery failed, retry bound exceeded, marking failed"
                    );
                    if let Some(metrics) = notifier_metrics::metrics() {
                        metrics.record_failed(notification.delivery_type.as_str(), next_retries);
                    }
                    self.store.mark_failed(notification.id, next_retries).await
                } else {
                    tracing::warn!(
                        id = %notification.id,
                        retries = next_retries,
                        error = %e,
                        "delivery failed, requeuing for retry"
                    );
                    if let Some(metrics) = notifier_metrics::metrics() {
                        metrics.record_retrying(notification.delivery_type.as_str());
                    }
                    self.store.requeue(notification.id, next_retries).await
                }
            }
        };

        if let Err(e) = store_result {
            tracing::error!(
                id = %notification.id,
                error = %e,
                "failed to record delivery outcome, offset will not be committed"
            );
            return true;
        }

        if let Err(e) = self.broker.commit(&delivered).await {
            tracing::error!(id = %notification.id, error = %e, "failed to commit broker offset");
        }

        true
    }

    /// Runs the poll-and-deliver loop until `shutdown` fires.
    pub async fn serve(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<Signal>) {
        tracing::info!("deliverer starting");

        loop {
            tokio::select! {
                processed = self.tick() => {
                    if processed {
                        tracing::debug!("deliverer processed a notification");
                    }
                }
                sig = shutdown.recv() => {
                    match sig {
                        Ok(Signal::Shutdown | Signal::Finalised) | Err(_) => {
                            tracing::info!("deliverer received shutdown signal");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("deliverer stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use notifier_adapters::Adapter;
    use notifier_broker::memory::MemoryBroker;
    use notifier_common::{
        AdapterError, BrokerConfig, Config, DeliveryType, DispatcherConfig, NewNotification,
        Notification, NotificationStatus, SmtpConfig, StoreConfig,
    };
    use notifier_store::MemoryStore;

    use super::*;

    fn config(max_retries: u8) -> Config {
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
                max_retries,
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

    struct AlwaysFail;

    #[async_trait]
    impl Adapter for AlwaysFail {
        async fn send(&self, _notification: &Notification) -> Result<(), AdapterError> {
            Err(AdapterError::Send(anyhow::anyhow!("simulated failure")))
        }
    }

    struct AlwaysOk;

    #[async_trait]
    impl Adapter for AlwaysOk {
        async fn send(&self, _notification: &Notification) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    async fn seed_in_queue(store: &MemoryStore, broker: &MemoryBroker) -> uuid::Uuid {
        let inserted = store
            .insert_batch(
                vec![NewNotification {
                    delivery_type: DeliveryType::Email,
                    recipient: "a@b.com".to_string(),
                    content: "hi".to_string(),
                }],
                10,
            )
            .await
            .unwrap();
        let id = inserted[0].id;
        broker.producer().publish(&inserted[0]).await.unwrap();
        store.mark_in_queue(&[id]).await.unwrap();
        id
    }

    #[tokio::test]
    async fn successful_delivery_marks_delivered() {
        let store = Arc::new(MemoryStore::new());
        let broker = MemoryBroker::new();
        let id = seed_in_queue(&store, &broker).await;

        let adapters =
            Arc::new(AdapterRegistry::new().with(DeliveryType::Email, Arc::new(AlwaysOk)));
        let deliverer = Deliverer::new(
            store.clone(),
            Arc::new(broker.consumer()),
            adapters,
            &config(3),
        );

        assert!(deliverer.tick().await);
        let stored = store.get_by_id(id).await.unwrap();
        assert_eq!(stored.status, NotificationStatus::Delivered);
        assert!(stored.sent_at.is_some());
        assert_eq!(stored.retries, 1);
    }

    #[tokio::test]
    async fn failed_delivery_under_retry_bound_requeues_as_pending() {
        let store = Arc::new(MemoryStore::new());
        let broker = MemoryBroker::new();
        let id = seed_in_queue(&store, &broker).await;

        let adapters =
            Arc::new(AdapterRegistry::new().with(DeliveryType::Email, Arc::new(AlwaysFail)));
        let deliverer = Deliverer::new(
            store.clone(),
            Arc::new(broker.consumer()),
            adapters,
            &config(3),
        );

        assert!(deliverer.tick().await);
        let stored = store.get_by_id(id).await.unwrap();
        assert_eq!(stored.status, NotificationStatus::Pending);
        assert_eq!(stored.retries, 1);
    }

    #[tokio::test]
    async fn failed_delivery_past_retry_bound_marks_failed() {
        let store = Arc::new(MemoryStore::new());
        let broker = MemoryBroker::new();
        let id = seed_in_queue(&store, &broker).await;
        // Exhaust the retry bound directly so the next failure pushes it over.
        store.requeue(id, 3).await.unwrap();
        store.mark_in_queue(&[id]).await.unwrap();

        let adapters =
            Arc::new(AdapterRegistry::new().with(DeliveryType::Email, Arc::new(AlwaysFail)));
        let deliverer = Deliverer::new(
            store.clone(),
            Arc::new(broker.consumer()),
            adapters,
            &config(3),
        );

        assert!(deliverer.tick().await);
        let stored = store.get_by_id(id).await.unwrap();
        assert_eq!(stored.status, NotificationStatus::Failed);
    }

    #[tokio::test]
    async fn tick_returns_false_when_nothing_queued() {
        let store = Arc::new(MemoryStore::new());
        let broker = MemoryBroker::new();
        let adapters = Arc::new(AdapterRegistry::new());
        let deliverer = Deliverer::new(store, Arc::new(broker.consumer()), adapters, &config(3));
        assert!(!deliverer.tick().await);
    }
}
