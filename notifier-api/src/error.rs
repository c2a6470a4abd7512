//! Maps store errors onto HTTP responses.

use axum::{http::StatusCode, response::IntoResponse, Json};
use notifier_common::StoreError;
use thiserror::Error;

use crate::dto::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Self::Store(StoreError::BatchTooLarge { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Store(StoreError::NotFound) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Store(StoreError::Transport(e)) => {
                tracing::error!(error = %e, "store transport error handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
