//! Route handlers: thin translation between HTTP and the [`Store`] trait.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use notifier_store::Store;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::{
        CreatedBatchResponse, CreatedResponse, NotificationCreate, NotificationsResponse,
    },
    error::ApiError,
};

pub struct ApiState {
    pub store: Arc<dyn Store>,
    pub max_batch_size: usize,
}

pub async fn create_notification(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<NotificationCreate>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let inserted = state.store.insert_batch(vec![body.into()], state.max_batch_size).await?;
    let id = inserted
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("insert returned no rows".to_string()))?
        .id;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn create_notifications_batch(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<Vec<NotificationCreate>>,
) -> Result<(StatusCode, Json<CreatedBatchResponse>), ApiError> {
    let items = body.into_iter().map(Into::into).collect();
    let inserted = state.store.insert_batch(items, state.max_batch_size).await?;
    let ids = inserted.into_iter().map(|n| n.id).collect();
    Ok((StatusCode::CREATED, Json(CreatedBatchResponse { ids })))
}

pub async fn get_notification(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::dto::NotificationResponse>, ApiError> {
    let notification = state.store.get_by_id(id).await?;
    Ok(Json(notification.into()))
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    ids: String,
}

pub async fn get_notifications_by_ids(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<IdsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let ids = query
        .ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Uuid>().map_err(|_| ApiError::BadRequest(format!("invalid id: {s}"))))
        .collect::<Result<Vec<_>, _>>()?;

    let notifications = state
        .store
        .get_by_ids(&ids, state.max_batch_size)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(NotificationsResponse { notifications }))
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    limit: Option<usize>,
}

pub async fn get_pending_notifications(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(state.max_batch_size);
    let notifications = state
        .store
        .get_pending(limit)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(NotificationsResponse { notifications }))
}
