//! Shared types, configuration, error taxonomy, and logging setup used across
//! the notifier workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod notification;

pub use config::{
    BrokerConfig, Config, ConfigError, DispatcherConfig, SmsConfig, SmtpConfig, StoreConfig,
    TelegramConfig,
};
pub use error::{AdapterError, BrokerError, StoreError};
pub use notification::{DeliveryType, NewNotification, Notification, NotificationStatus};

/// Cooperative shutdown signal broadcast to every long-running worker.
///
/// Workers hold a `tokio::sync::broadcast::Receiver<Signal>` and check it
/// between iterations of their poll loop (see `notifier-dispatcher` and the
/// root binary's supervisor). `Shutdown` asks a worker to stop accepting new
/// work and finish what is in flight; `Finalised` is sent once every worker
/// has acknowledged `Shutdown`, and tells components waiting on full
/// drain (e.g. the broker client) that it is safe to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
    Finalised,
}
