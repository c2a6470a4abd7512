//! Health check logic.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

/// Thread-safe readiness tracking for the dispatcher's dependencies.
#[derive(Debug)]
pub struct HealthChecker {
    /// Whether the store connection has been established.
    store_ready: Arc<AtomicBool>,

    /// Whether the broker producer/consumer connections have been established.
    broker_ready: Arc<AtomicBool>,

    /// Current count of pending notifications.
    queue_size: Arc<AtomicU64>,

    /// Maximum queue size threshold for readiness.
    max_queue_size: u64,
}

impl HealthChecker {
    #[must_use]
    pub fn new(max_queue_size: u64) -> Self {
        Self {
            store_ready: Arc::new(AtomicBool::new(false)),
            broker_ready: Arc::new(AtomicBool::new(false)),
            queue_size: Arc::new(AtomicU64::new(0)),
            max_queue_size,
        }
    }

    pub fn set_store_ready(&self, ready: bool) {
        self.store_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "store readiness updated");
    }

    pub fn set_broker_ready(&self, ready: bool) {
        self.broker_ready.store(ready, Ordering::Relaxed);
        tracing::debug!(ready, "broker readiness updated");
    }

    pub fn set_queue_size(&self, size: u64) {
        self.queue_size.store(size, Ordering::Relaxed);
    }

    /// For liveness, responding at all is the signal; if the process can't
    /// respond, the HTTP server itself is dead and the caller's own timeout
    /// will detect that.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        true
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        let store_ok = self.store_ready.load(Ordering::Relaxed);
        let broker_ok = self.broker_ready.load(Ordering::Relaxed);
        let current_queue = self.queue_size.load(Ordering::Relaxed);
        let queue_ok = current_queue < self.max_queue_size;

        let ready = store_ok && broker_ok && queue_ok;

        if !ready {
            tracing::debug!(
                store_ready = store_ok,
                broker_ready = broker_ok,
                queue_size = current_queue,
                max_queue_size = self.max_queue_size,
                "readiness check failed"
            );
        }

        ready
    }

    #[must_use]
    pub fn get_status(&self) -> HealthStatus {
        HealthStatus {
            alive: self.is_alive(),
            ready: self.is_ready(),
            store_ready: self.store_ready.load(Ordering::Relaxed),
            broker_ready: self.broker_ready.load(Ordering::Relaxed),
            queue_size: self.queue_size.load(Ordering::Relaxed),
            max_queue_size: self.max_queue_size,
        }
    }
}

/// Detailed health status, returned on a failed readiness probe.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthStatus {
    pub alive: bool,
    pub ready: bool,
    pub store_ready: bool,
    pub broker_ready: bool,
    pub queue_size: u64,
    pub max_queue_size: u64,
}
