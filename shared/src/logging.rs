//! Shared logging utilities for consistent tracing setup

use chrono::{DateTime, Utc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the stdout tracing subscriber with an optional base level.
///
/// Noise from dependency crates is pinned to `warn` so dispatch and attempt
/// logs stay readable.
pub fn init_tracing(log_level: Option<&str>) {
    let base_level = log_level.unwrap_or("info");
    let filter = format!("engine={base_level},shared={base_level},warn");

    fmt()
        .with_env_filter(EnvFilter::new(&filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Contextual logging helper for startup messages
pub fn log_startup(details: &str) {
    info!(timestamp = %format_timestamp(), "🚀 Starting {}", details);
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(reason: &str) {
    info!(timestamp = %format_timestamp(), "🛑 Shutting down: {}", reason);
}
