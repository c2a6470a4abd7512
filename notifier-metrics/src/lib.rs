//! OpenTelemetry metrics for the notification dispatcher, exported over OTLP
//! to a collector (which can in turn expose them for Prometheus to scrape).

mod config;
mod dispatcher;
mod error;
mod exporter;

pub use config::MetricsConfig;
pub use dispatcher::DispatcherMetrics;
pub use error::MetricsError;
use once_cell::sync::OnceCell;

static METRICS_INSTANCE: OnceCell<DispatcherMetrics> = OnceCell::new();

/// Initializes the metrics system. A no-op if `config.enabled` is `false`.
///
/// # Errors
/// Returns an error if the OTLP exporter cannot be constructed, or if called
/// more than once.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("metrics collection is disabled");
        return Ok(());
    }

    let provider = exporter::init_otlp_exporter(&config.endpoint)?;
    opentelemetry::global::set_meter_provider(provider);

    let metrics = DispatcherMetrics::new()?;
    METRICS_INSTANCE
        .set(metrics)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    tracing::info!("metrics collection initialized");
    Ok(())
}

/// Returns the global metrics instance, if initialized.
#[must_use]
pub fn metrics() -> Option<&'static DispatcherMetrics> {
    METRICS_INSTANCE.get()
}
