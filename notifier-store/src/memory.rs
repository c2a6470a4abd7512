//! In-memory [`Store`] implementation, used by tests and local development.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_common::{NewNotification, Notification, NotificationStatus, StoreError};
use uuid::Uuid;

use crate::Store;

/// Stores notifications in a `HashMap` guarded by an `RwLock`.
///
/// Mirrors the shape of a real row store closely enough to exercise the
/// dispatcher's logic in tests, but offers none of a database's durability or
/// cross-process visibility.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<HashMap<Uuid, Notification>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<std::sync::PoisonError<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Notification>>>>
    for StoreError
{
    fn from(
        e: std::sync::PoisonError<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Notification>>>,
    ) -> Self {
        Self::Transport(anyhow::anyhow!("lock poisoned: {e}"))
    }
}

impl From<std::sync::PoisonError<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Notification>>>>
    for StoreError
{
    fn from(
        e: std::sync::PoisonError<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Notification>>>,
    ) -> Self {
        Self::Transport(anyhow::anyhow!("lock poisoned: {e}"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_batch(
        &self,
        items: Vec<NewNotification>,
        max_batch_size: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        if items.len() > max_batch_size {
            return Err(StoreError::BatchTooLarge {
                requested: items.len(),
                max: max_batch_size,
            });
        }

        let now = Utc::now();
        let mut rows = self.rows.write()?;
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let notification = Notification {
                id: Uuid::new_v4(),
                delivery_type: item.delivery_type,
                recipient: item.recipient,
                content: item.content,
                status: NotificationStatus::Pending,
                retries: 0,
                created_at: now,
                sent_at: None,
            };
            rows.insert(notification.id, notification.clone());
            inserted.push(notification);
        }
        Ok(inserted)
    }

    async fn get_pending(&self, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let rows = self.rows.read()?;
        let mut pending: Vec<_> = rows
            .values()
            .filter(|n| n.status == NotificationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|n| n.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Notification, StoreError> {
        self.rows
            .read()?
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_ids(
        &self,
        ids: &[Uuid],
        max_batch_size: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        if ids.len() > max_batch_size {
            return Err(StoreError::BatchTooLarge {
                requested: ids.len(),
                max: max_batch_size,
            });
        }
        let rows = self.rows.read()?;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn mark_in_queue(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        let mut rows = self.rows.write()?;
        for id in ids {
            if let Some(row) = rows.get_mut(id) {
                if row.status == NotificationStatus::Pending {
                    row.status = NotificationStatus::InQueue;
                }
            }
        }
        Ok(())
    }

    async fn mark_delivered(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        retries: u8,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write()?;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !row.status.is_terminal() {
            row.status = NotificationStatus::Delivered;
            row.sent_at = Some(sent_at);
            row.retries = retries;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, retries: u8) -> Result<(), StoreError> {
        let mut rows = self.rows.write()?;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !row.status.is_terminal() {
            row.status = NotificationStatus::Failed;
            row.retries = retries;
        }
        Ok(())
    }

    async fn requeue(&self, id: Uuid, retries: u8) -> Result<(), StoreError> {
        let mut rows = self.rows.write()?;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if !row.status.is_terminal() {
            row.status = NotificationStatus::Pending;
            row.retries = retries;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use notifier_common::DeliveryType;

    use super::*;

    fn new_item() -> NewNotification {
        NewNotification {
            delivery_type: DeliveryType::Email,
            recipient: "user@example.com".to_string(),
            content: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_pending() {
        let store = MemoryStore::new();
        let inserted = store.insert_batch(vec![new_item()], 10).await.unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].status, NotificationStatus::Pending);
        assert_eq!(inserted[0].retries, 0);

        let pending = store.get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, inserted[0].id);
    }

    #[tokio::test]
    async fn insert_batch_rejects_oversized_batch() {
        let store = MemoryStore::new();
        let items = vec![new_item(), new_item(), new_item()];
        let err = store.insert_batch(items, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { requested: 3, max: 2 }));
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let store = MemoryStore::new();
        let inserted = store.insert_batch(vec![new_item()], 10).await.unwrap();
        let id = inserted[0].id;

        store.mark_in_queue(&[id]).await.unwrap();
        let row = store.get_by_id(id).await.unwrap();
        assert_eq!(row.status, NotificationStatus::InQueue);

        let now = Utc::now();
        store.mark_delivered(id, now, 1).await.unwrap();
        let row = store.get_by_id(id).await.unwrap();
        assert_eq!(row.status, NotificationStatus::Delivered);
        assert_eq!(row.sent_at, Some(now));
        assert_eq!(row.retries, 1);

        // A terminal row cannot be re-queued.
        store.requeue(id, 2).await.unwrap();
        let row = store.get_by_id(id).await.unwrap();
        assert_eq!(row.status, NotificationStatus::Delivered);
    }

    #[tokio::test]
    async fn mark_in_queue_is_idempotent_and_skips_non_pending() {
        let store = MemoryStore::new();
        let inserted = store.insert_batch(vec![new_item()], 10).await.unwrap();
        let id = inserted[0].id;

        store.mark_in_queue(&[id]).await.unwrap();
        store.mark_in_queue(&[id]).await.unwrap();
        let row = store.get_by_id(id).await.unwrap();
        assert_eq!(row.status, NotificationStatus::InQueue);
    }

    #[tokio::test]
    async fn get_by_ids_omits_missing_and_enforces_batch_size() {
        let store = MemoryStore::new();
        let inserted = store
            .insert_batch(vec![new_item(), new_item()], 10)
            .await
            .unwrap();
        let ids = vec![inserted[0].id, Uuid::new_v4()];

        let found = store.get_by_ids(&ids, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, inserted[0].id);

        let err = store.get_by_ids(&ids, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::BatchTooLarge { requested: 2, max: 1 }));
    }

    #[tokio::test]
    async fn get_by_id_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
