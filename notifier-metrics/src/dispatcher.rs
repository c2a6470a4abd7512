//! Dispatcher pipeline metrics: producer throughput, delivery outcomes,
//! retry counts, and queue depth.

use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

use crate::MetricsError;

/// Metric instruments for the producer/consumer pipeline.
#[derive(Debug)]
pub struct DispatcherMetrics {
    /// Notifications published to the broker, per delivery type.
    published_total: Counter<u64>,

    /// Delivery attempts, per delivery type and outcome (`delivered`, `retrying`, `failed`).
    delivery_attempts_total: Counter<u64>,

    /// Distribution of end-to-end latency (`created_at` to `sent_at`) in seconds.
    delivery_latency_seconds: Histogram<f64>,

    /// Distribution of retry counts at the point a notification reaches a terminal status.
    retries_at_terminal: Histogram<u64>,
}

impl DispatcherMetrics {
    /// # Errors
    /// Returns an error if metric instruments cannot be created.
    pub fn new() -> Result<Self, MetricsError> {
        let meter = meter();

        Ok(Self {
            published_total: meter
                .u64_counter("notifier.dispatcher.published.total")
                .with_description("Total notifications published to the broker")
                .build(),
            delivery_attempts_total: meter
                .u64_counter("notifier.dispatcher.delivery_attempts.total")
                .with_description("Total delivery attempts by outcome")
                .build(),
            delivery_latency_seconds: meter
                .f64_histogram("notifier.dispatcher.delivery_latency.seconds")
                .with_description("Time from creation to confirmed delivery")
                .build(),
            retries_at_terminal: meter
                .u64_histogram("notifier.dispatcher.retries_at_terminal")
                .with_description("Retry count observed when a notification reaches Delivered or Failed")
                .build(),
        })
    }

    pub fn record_published(&self, delivery_type: &str, count: u64) {
        self.published_total
            .add(count, &[KeyValue::new("delivery_type", delivery_type.to_string())]);
    }

    pub fn record_delivered(&self, delivery_type: &str, latency_secs: f64, retries: u8) {
        let attrs = [
            KeyValue::new("delivery_type", delivery_type.to_string()),
            KeyValue::new("outcome", "delivered"),
        ];
        self.delivery_attempts_total.add(1, &attrs);
        self.delivery_latency_seconds.record(latency_secs, &attrs);
        self.retries_at_terminal.record(u64::from(retries), &attrs);
    }

    pub fn record_retrying(&self, delivery_type: &str) {
        let attrs = [
            KeyValue::new("delivery_type", delivery_type.to_string()),
            KeyValue::new("outcome", "retrying"),
        ];
        self.delivery_attempts_total.add(1, &attrs);
    }

    pub fn record_failed(&self, delivery_type: &str, retries: u8) {
        let attrs = [
            KeyValue::new("delivery_type", delivery_type.to_string()),
            KeyValue::new("outcome", "failed"),
        ];
        self.delivery_attempts_total.add(1, &attrs);
        self.retries_at_terminal.record(u64::from(retries), &attrs);
    }
}

fn meter() -> Meter {
    opentelemetry::global::meter("notifier.dispatcher")
}
