//! Shared utilities for the trading workspace.

mod environment;
mod throttle;

pub use environment::{ParseTradingModeError, TradingMode};
pub use throttle::Throttle;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; falls back to `info` when unset or invalid. Safe to
/// call more than once, later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
