//! The `Store` abstraction over the durable notification table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_common::{NewNotification, Notification, StoreError};
use uuid::Uuid;

/// Durable, transactional access to the notification table.
///
/// Implementations must uphold the invariants the dispatcher relies on:
/// - `insert_batch` assigns `id`, `created_at`, `status = Pending`, `retries = 0`.
/// - `mark_in_queue` is only ever called after a batch has been confirmed
///   published; it is safe to call more than once for the same id (at-least-once).
/// - `requeue` and `mark_failed`/`mark_delivered` are no-ops (or reject) once a
///   row is already in a terminal status, so a late retry can never resurrect a
///   delivered or permanently failed notification.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists new notifications, returning them with server-assigned fields set.
    ///
    /// # Errors
    /// Returns [`StoreError::BatchTooLarge`] if `items.len()` exceeds the
    /// configured maximum, or [`StoreError::Transport`] on a connection failure.
    async fn insert_batch(
        &self,
        items: Vec<NewNotification>,
        max_batch_size: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Reads up to `limit` notifications in `Pending` status, oldest first.
    ///
    /// # Errors
    /// Returns [`StoreError::BatchTooLarge`] if `limit` exceeds the configured
    /// maximum, or [`StoreError::Transport`] on a connection failure.
    async fn get_pending(&self, limit: usize) -> Result<Vec<Notification>, StoreError>;

    /// Reads a single notification by id.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if no row matches, or
    /// [`StoreError::Transport`] on a connection failure.
    async fn get_by_id(&self, id: Uuid) -> Result<Notification, StoreError>;

    /// Reads a batch of notifications by id. Missing ids are silently omitted
    /// from the result rather than causing the whole call to fail.
    ///
    /// # Errors
    /// Returns [`StoreError::BatchTooLarge`] if `ids.len()` exceeds the
    /// configured maximum, or [`StoreError::Transport`] on a connection failure.
    async fn get_by_ids(
        &self,
        ids: &[Uuid],
        max_batch_size: usize,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Marks a batch of notifications as `InQueue`, once their publish to the
    /// broker has been confirmed. Idempotent: ids already `InQueue` or in a
    /// terminal status are left untouched.
    ///
    /// # Errors
    /// Returns [`StoreError::Transport`] on a connection failure.
    async fn mark_in_queue(&self, ids: &[Uuid]) -> Result<(), StoreError>;

    /// Marks a notification `Delivered`, recording the delivery timestamp and
    /// the retry counter. `retries` is incremented on every delivery attempt,
    /// successful or not, so it records attempts made rather than failures.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` does not exist, or
    /// [`StoreError::Transport`] on a connection failure.
    async fn mark_delivered(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        retries: u8,
    ) -> Result<(), StoreError>;

    /// Marks a notification permanently `Failed`, recording the retry counter
    /// at the point it crossed the retry bound.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` does not exist, or
    /// [`StoreError::Transport`] on a connection failure.
    async fn mark_failed(&self, id: Uuid, retries: u8) -> Result<(), StoreError>;

    /// Re-queues a notification as `Pending` with an updated retry count, so
    /// the producer picks it up again on its next tick.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `id` does not exist, or
    /// [`StoreError::Transport`] on a connection failure.
    async fn requeue(&self, id: Uuid, retries: u8) -> Result<(), StoreError>;
}
