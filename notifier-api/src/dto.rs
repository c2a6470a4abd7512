//! Wire types for the HTTP ingress. Kept distinct from [`notifier_common::Notification`]
//! so the storage schema can evolve independently of the public contract.

use chrono::{DateTime, Utc};
use notifier_common::{NewNotification, Notification};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single notification submitted by a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationCreate {
    pub delivery_type: String,
    pub recipient: String,
    pub content: String,
}

impl From<NotificationCreate> for NewNotification {
    fn from(value: NotificationCreate) -> Self {
        Self {
            delivery_type: value.delivery_type.into(),
            recipient: value.recipient,
            content: value.content,
        }
    }
}

/// A notification as returned to callers, including its current lifecycle state.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub delivery_type: String,
    pub recipient: String,
    pub content: String,
    pub status: String,
    pub retries: u8,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            delivery_type: n.delivery_type.to_string(),
            recipient: n.recipient,
            content: n.content,
            status: n.status.to_string(),
            retries: n.retries,
            created_at: n.created_at,
            sent_at: n.sent_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreatedBatchResponse {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationResponse>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
