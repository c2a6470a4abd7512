//! Postgres-backed [`Store`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifier_common::{DeliveryType, NewNotification, Notification, NotificationStatus, StoreError};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use crate::Store;

/// Row shape of the `notifications` table. Kept separate from
/// [`Notification`] so storage concerns (column names, raw status strings)
/// don't leak into the domain type.
#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    delivery_type: String,
    recipient: String,
    content: String,
    status: String,
    retries: i16,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            delivery_type: DeliveryType::from(row.delivery_type),
            recipient: row.recipient,
            content: row.content,
            status: status_from_str(&row.status),
            retries: row.retries.clamp(0, i16::from(u8::MAX)) as u8,
            created_at: row.created_at,
            sent_at: row.sent_at,
        }
    }
}

fn status_from_str(s: &str) -> NotificationStatus {
    match s {
        "in_queue" => NotificationStatus::InQueue,
        "delivered" => NotificationStatus::Delivered,
        "failed" => NotificationStatus::Failed,
        "retrying" => NotificationStatus::Retrying,
        _ => NotificationStatus::Pending,
    }
}

/// Durable store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects to `dsn` with a pool of at most `max_connections` connections
    /// and runs the crate's bundled migrations.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established or a
    /// migration fails.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(dsn)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Wraps an already-connected pool, for callers that manage the pool
    /// lifecycle themselves (e.g. sharing it with another component).
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PostgresStore {
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let row: NotificationRow = sqlx::query_as(
                r"
                INSERT INTO notifications (id, delivery_type, recipient, content, status, retries, created_at)
                VALUES ($1, $2, $3, $4, 'pending', 0, NOW())
                RETURNING id, delivery_type, recipient, content, status, retries, created_at, sent_at
                ",
            )
            .bind(Uuid::new_v4())
            .bind(item.delivery_type.as_str())
            .bind(item.recipient)
            .bind(item.content)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

            inserted.push(Notification::from(row));
        }

        tx.commit().await.map_err(|e| StoreError::Transport(e.into()))?;

        Ok(inserted)
    }

    async fn get_pending(&self, limit: usize) -> Result<Vec<Notification>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<NotificationRow> = sqlx::query_as(
            r"
            SELECT id, delivery_type, recipient, content, status, retries, created_at, sent_at
            FROM notifications
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Notification, StoreError> {
        let row: Option<NotificationRow> = sqlx::query_as(
            r"
            SELECT id, delivery_type, recipient, content, status, retries, created_at, sent_at
            FROM notifications
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        row.map(Notification::from).ok_or(StoreError::NotFound)
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

        let rows: Vec<NotificationRow> = sqlx::query_as(
            r"
            SELECT id, delivery_type, recipient, content, status, retries, created_at, sent_at
            FROM notifications
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_in_queue(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE notifications
            SET status = 'in_queue'
            WHERE id = ANY($1) AND status = 'pending'
            ",
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        Ok(())
    }

    async fn mark_delivered(
        &self,
        id: Uuid,
        sent_at: DateTime<Utc>,
        retries: u8,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE notifications
            SET status = 'delivered', sent_at = $2, retries = $3
            WHERE id = $1 AND status NOT IN ('delivered', 'failed')
            ",
        )
        .bind(id)
        .bind(sent_at)
        .bind(i16::from(retries))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        if result.rows_affected() == 0 && self.get_by_id(id).await.is_err() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, retries: u8) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE notifications
            SET status = 'failed', retries = $2
            WHERE id = $1 AND status NOT IN ('delivered', 'failed')
            ",
        )
        .bind(id)
        .bind(i16::from(retries))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        if result.rows_affected() == 0 && self.get_by_id(id).await.is_err() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn requeue(&self, id: Uuid, retries: u8) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE notifications
            SET status = 'pending', retries = $2
            WHERE id = $1 AND status NOT IN ('delivered', 'failed')
            ",
        )
        .bind(id)
        .bind(i16::from(retries))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;

        if result.rows_affected() == 0 && self.get_by_id(id).await.is_err() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
