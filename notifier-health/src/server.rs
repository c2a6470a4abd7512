//! Health check HTTP server.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use notifier_common::Signal;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

use crate::{HealthChecker, HealthConfig, HealthError};

/// Provides `/healthz` and `/readyz` endpoints for orchestrator probes.
pub struct HealthServer {
    listener: TcpListener,
    router: Router,
}

impl HealthServer {
    /// # Errors
    /// Returns [`HealthError::BindError`] if binding the listen address fails.
    pub async fn new(
        config: &HealthConfig,
        health_checker: Arc<HealthChecker>,
    ) -> Result<Self, HealthError> {
        let listener =
            TcpListener::bind(&config.listen_address)
                .await
                .map_err(|e| HealthError::BindError {
                    address: config.listen_address.clone(),
                    source: e,
                })?;

        tracing::info!(address = %config.listen_address, "health check server bound");

        let router = Router::new()
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .with_state(health_checker)
            .layer(TimeoutLayer::new(Duration::from_secs(1)));

        Ok(Self { listener, router })
    }

    /// Runs until `shutdown` fires.
    ///
    /// # Errors
    /// Returns [`HealthError::ServerError`] if the server exits abnormally.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), HealthError> {
        tracing::info!("health check server starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("health check server received shutdown signal");
            })
            .await
            .map_err(|e| HealthError::ServerError(e.to_string()))?;

        tracing::info!("health check server stopped");
        Ok(())
    }
}

async fn liveness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_alive() {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
    }
}

async fn readiness_handler(State(health_checker): State<Arc<HealthChecker>>) -> Response {
    if health_checker.is_ready() {
        (StatusCode::OK, "OK").into_response()
    } else {
        let status = health_checker.get_status();
        tracing::warn!(
            store_ready = status.store_ready,
            broker_ready = status.broker_ready,
            queue_size = status.queue_size,
            max_queue_size = status.max_queue_size,
            "readiness probe failed"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_always_passes() {
        let checker = Arc::new(HealthChecker::new(10_000));
        let response = liveness_handler(State(checker)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_fails_when_dependencies_not_ready() {
        let checker = Arc::new(HealthChecker::new(10_000));
        let response = readiness_handler(State(checker)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn readiness_passes_when_ready() {
        let checker = Arc::new(HealthChecker::new(10_000));
        checker.set_store_ready(true);
        checker.set_broker_ready(true);
        checker.set_queue_size(10);

        let response = readiness_handler(State(checker)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_fails_when_queue_too_large() {
        let checker = Arc::new(HealthChecker::new(1_000));
        checker.set_store_ready(true);
        checker.set_broker_ready(true);
        checker.set_queue_size(2_000);

        let response = readiness_handler(State(checker)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
