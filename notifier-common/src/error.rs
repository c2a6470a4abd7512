//! Foundational error types shared by the store, broker, and adapter crates.

use thiserror::Error;

/// Errors that can occur in the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller requested an insert or read of more than `MaxBatchSize` rows.
    #[error("batch of {requested} exceeds the configured maximum of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    /// A point read (`get_by_id`) found no matching row.
    #[error("notification not found")]
    NotFound,

    /// Connection or query failure; callers should log and skip the current
    /// tick rather than propagate (see `notifier-dispatcher`).
    #[error("store transport error: {0}")]
    Transport(#[source] anyhow::Error),
}

/// Errors raised by the broker client (producer or consumer side).
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Failed to establish the broker connection; fatal at construction time.
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] anyhow::Error),

    /// A single message could not be enqueued with the producer.
    #[error("failed to enqueue message: {0}")]
    Enqueue(#[source] anyhow::Error),

    /// A poll did not return a message before its timeout elapsed; not an error
    /// condition, just a signal to loop again.
    #[error("poll timed out")]
    Timeout,

    /// A non-timeout error surfaced while polling.
    #[error("poll failed: {0}")]
    Poll(#[source] anyhow::Error),
}

/// Errors raised while attempting a single delivery attempt through an adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The sink rejected or failed to deliver the message. Adapters do not
    /// distinguish transient from permanent failure here; every send failure
    /// is treated the same way by the retry policy in `notifier-dispatcher`.
    #[error("delivery failed: {0}")]
    Send(#[source] anyhow::Error),

    /// No adapter is registered for the notification's delivery type.
    #[error("no adapter registered for delivery type {0:?}")]
    UnknownDeliveryType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_too_large_message() {
        let err = StoreError::BatchTooLarge {
            requested: 51,
            max: 50,
        };
        assert_eq!(
            err.to_string(),
            "batch of 51 exceeds the configured maximum of 50"
        );
    }
}
