//! Metrics system configuration.

use serde::Deserialize;

/// Controls whether, and where, metrics are exported.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// OTLP/HTTP collector endpoint, e.g. `http://localhost:4318`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:4318".to_string()
}

impl MetricsConfig {
    /// Reads `METRICS_ENABLED` and `METRICS_ENDPOINT`, falling back to
    /// [`MetricsConfig::default`] for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            enabled: std::env::var("METRICS_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.enabled),
            endpoint: std::env::var("METRICS_ENDPOINT").unwrap_or(default.endpoint),
        }
    }
}
