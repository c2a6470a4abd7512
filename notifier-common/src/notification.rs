//! The core `Notification` entity and its state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The channel a notification is delivered through.
///
/// New channels can be added without a breaking change via [`DeliveryType::Other`];
/// the adapter registry (see `notifier-adapters`) maps each known variant (and,
/// optionally, custom names) to a concrete sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeliveryType {
    Email,
    Sms,
    Telegram,
    Other(String),
}

impl DeliveryType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Telegram => "telegram",
            Self::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DeliveryType {
    fn from(value: &str) -> Self {
        match value {
            "email" => Self::Email,
            "sms" => Self::Sms,
            "telegram" => Self::Telegram,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DeliveryType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl Serialize for DeliveryType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeliveryType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// The state a [`Notification`] occupies in its delivery lifecycle.
///
/// Transitions (see `notifier-dispatcher`):
/// `Pending -> InQueue` (producer, on confirmed publish)
/// `InQueue -> Delivered | Failed | Pending` (consumer, on delivery outcome)
///
/// `Retrying` is part of the declared state space but is never written by the
/// core pipeline: a retryable failure is re-queued as `Pending` so the producer
/// picks it up again on its next tick (see `notifier-dispatcher::consumer`). It
/// is kept here for API/storage forward-compatibility with deployments that
/// want to surface "about to retry" as a distinct externally observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    InQueue,
    Delivered,
    Failed,
    Retrying,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InQueue => "in_queue",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        };
        f.write_str(s)
    }
}

impl NotificationStatus {
    /// Terminal statuses never transition away once written (see `notifier-store`).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Failed)
    }
}

/// A single delivery request, persisted for at-least-once delivery tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub delivery_type: DeliveryType,
    pub recipient: String,
    pub content: String,
    pub status: NotificationStatus,
    pub retries: u8,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Fields supplied by an ingress caller for a new notification; the store
/// assigns `id`, `created_at`, `status = Pending`, and `retries = 0`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub delivery_type: DeliveryType,
    pub recipient: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_type_round_trips_known_variants() {
        for (raw, expected) in [
            ("email", DeliveryType::Email),
            ("sms", DeliveryType::Sms),
            ("telegram", DeliveryType::Telegram),
        ] {
            assert_eq!(DeliveryType::from(raw), expected);
            assert_eq!(expected.as_str(), raw);
        }
    }

    #[test]
    fn delivery_type_preserves_unknown_values() {
        let custom = DeliveryType::from("push");
        assert_eq!(custom, DeliveryType::Other("push".to_string()));
        assert_eq!(custom.to_string(), "push");
    }

    #[test]
    fn terminal_statuses() {
        assert!(NotificationStatus::Delivered.is_terminal());
        assert!(NotificationStatus::Failed.is_terminal());
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(!NotificationStatus::InQueue.is_terminal());
        assert!(!NotificationStatus::Retrying.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationStatus::InQueue).unwrap();
        assert_eq!(json, "\"in_queue\"");
    }
}
