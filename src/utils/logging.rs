use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::utils::sink::LogSinks;

/// Parses a level name, defaulting to INFO for anything unrecognised.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing/logging for the application.
///
/// Console output goes through the fmt layer; every record that passes the
/// level filter is also handed to the registered `sinks`.
pub fn init(default_level: &str, sinks: LogSinks) {
    let lvl = parse_level(default_level);

    // Use try_init so tests and libraries can call this multiple times without panicking
    let _ = tracing_subscriber::registry()
        .with(LevelFilter::from_level(lvl))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sinks)
        .try_init();
}
