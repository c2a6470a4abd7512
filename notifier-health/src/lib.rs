//! Liveness and readiness HTTP endpoints for orchestrator probes.
//!
//! - `/healthz` — the process can respond at all
//! - `/readyz` — the store and broker connections are up and the
//!   pending queue is under its configured threshold

mod checker;
mod config;
mod error;
mod server;

pub use checker::{HealthChecker, HealthStatus};
pub use config::HealthConfig;
pub use error::HealthError;
pub use server::HealthServer;
