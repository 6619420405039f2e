//! Structured logging setup.
//!
//! Filters come from `RUST_LOG` when set, otherwise from the default passed
//! in by the caller.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a human-readable subscriber.
///
/// Returns an error if a global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(default_filter))
        .with(fmt::layer().with_target(true))
        .try_init()
}

/// Install a JSON subscriber for log aggregation.
pub fn init_json(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(default_filter))
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .try_init()
}
