//! The ingress HTTP server.

use std::{sync::Arc, time::Duration};

use axum::{routing::get, routing::post, Router};
use notifier_common::Signal;
use notifier_store::Store;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    create_notification, create_notifications_batch, get_notification,
    get_notifications_by_ids, get_pending_notifications, ApiState,
};

#[derive(Debug, Error)]
pub enum ApiServerError {
    #[error("failed to bind api server to {address}: {source}")]
    BindError {
        address: String,
        source: std::io::Error,
    },

    #[error("api server error: {0}")]
    ServerError(String),
}

/// The notification ingress API: accepts new notifications and exposes their
/// current delivery status for inspection.
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// # Errors
    /// Returns [`ApiServerError::BindError`] if binding the listen address fails.
    pub async fn new(
        bind_address: &str,
        store: Arc<dyn Store>,
        max_batch_size: usize,
        request_timeout: Duration,
    ) -> Result<Self, ApiServerError> {
        let listener = TcpListener::bind(bind_address)
            .await
            .map_err(|e| ApiServerError::BindError {
                address: bind_address.to_string(),
                source: e,
            })?;

        tracing::info!(address = %bind_address, "ingress api server bound");

        let router = build_router(store, max_batch_size, request_timeout);

        Ok(Self { listener, router })
    }

    /// Runs until `shutdown` fires.
    ///
    /// # Errors
    /// Returns [`ApiServerError::ServerError`] if the server exits abnormally.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), ApiServerError> {
        tracing::info!("ingress api server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("ingress api server received shutdown signal");
            })
            .await
            .map_err(|e| ApiServerError::ServerError(e.to_string()))?;

        tracing::info!("ingress api server stopped");
        Ok(())
    }
}

fn build_router(store: Arc<dyn Store>, max_batch_size: usize, request_timeout: Duration) -> Router {
    let state = Arc::new(ApiState { store, max_batch_size });

    Router::new()
        .route("/notifications", post(create_notification).get(get_notifications_by_ids))
        .route("/notifications/batch", post(create_notifications_batch))
        .route("/notifications/pending", get(get_pending_notifications))
        .route("/notifications/:id", get(get_notification))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use notifier_store::MemoryStore;
    use tower::ServiceExt;

    use super::*;

    fn router() -> Router {
        build_router(Arc::new(MemoryStore::new()), 100, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips() {
        let app = router();

        let create_body = r#"{"delivery_type":"email","recipient":"a@b.com","content":"hi"}"#;
        let response = app
            .clone()
            .oneshot(
                Request::post("/notifications")
                    .header("content-type", "application/json")
                    .body(Body::from(create_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let id = created["id"].as_str().unwrap();

        let response = app
            .oneshot(Request::get(format!("/notifications/{id}")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let app = router();
        let response = app
            .oneshot(
                Request::get(format!("/notifications/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pending_endpoint_lists_newly_created_notifications() {
        let app = router();

        let create_body = r#"{"delivery_type":"sms","recipient":"+15555550123","content":"code"}"#;
        app.clone()
            .oneshot(
                Request::post("/notifications")
                    .header("content-type", "application/json")
                    .body(Body::from(create_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(Request::get("/notifications/pending").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
    }
}
