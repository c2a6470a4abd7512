//! Process-wide `tracing` subscriber setup.

use chrono::Utc;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    fmt::time::FormatTime, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt, Layer,
};

struct Time;

impl FormatTime for Time {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let time = Utc::now();
        w.write_fmt(format_args!("{:?}", time.timestamp_micros()))
    }
}

/// Initializes the global `tracing` subscriber.
///
/// `LOG_LEVEL` selects the filter level (`error`, `warn`, `info`, `trace`);
/// unset defaults to `trace` in debug builds and `info` in release builds.
/// `LOG_FORMAT=json` switches to newline-delimited JSON output, which is what
/// the production deployment's log shipper expects.
pub fn init() {
    let level = if let Ok(level) = std::env::var("LOG_LEVEL") {
        match level.to_ascii_lowercase().as_str() {
            "error" => LevelFilter::ERROR,
            "warn" => LevelFilter::WARN,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    } else if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::Registry::default();

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(Time)
                    .with_filter(level),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_timer(Time)
                    .with_target(true)
                    .with_filter(level),
            )
            .init();
    }
}
