//! Health check server configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// If the pending-notification queue exceeds this size, readiness fails.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: u64,
}

const fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "0.0.0.0:8081".to_string()
}

const fn default_max_queue_size() -> u64 {
    10_000
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_address: default_listen_address(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

impl HealthConfig {
    /// Reads `HEALTH_ENABLED`, `HEALTH_LISTEN_ADDRESS`, and
    /// `HEALTH_MAX_QUEUE_SIZE`, falling back to [`HealthConfig::default`] for
    /// anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            enabled: std::env::var("HEALTH_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.enabled),
            listen_address: std::env::var("HEALTH_LISTEN_ADDRESS")
                .unwrap_or(default.listen_address),
            max_queue_size: std::env::var("HEALTH_MAX_QUEUE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_queue_size),
        }
    }
}
