//! Delivery-type-specific sinks and the registry that dispatches between them.

pub mod email;
pub mod registry;
pub mod sms;
pub mod telegram;

pub use email::SmtpAdapter;
pub use registry::AdapterRegistry;
pub use sms::SmsAdapter;
pub use telegram::TelegramAdapter;

use async_trait::async_trait;
use notifier_common::{AdapterError, Notification};

/// A sink capable of delivering one [`DeliveryType`](notifier_common::DeliveryType).
///
/// Adapters are stateless with respect to the retry policy: a single call to
/// `send` is one delivery attempt. Retrying, backoff, and giving up after a
/// bound are the dispatcher's concern, not the adapter's (see
/// `notifier-dispatcher`).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Attempts a single delivery of `notification`.
    ///
    /// # Errors
    /// Returns [`AdapterError::Send`] if the sink rejects or fails to deliver
    /// the message. Adapters do not classify the failure as transient or
    /// permanent.
    async fn send(&self, notification: &Notification) -> Result<(), AdapterError>;
}
