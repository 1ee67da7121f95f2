//! # Test Logging
//!
//! Installs a `tracing` subscriber for scenario runs.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a fmt subscriber writing through the test harness capture.
///
/// Reads the filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_target(true)
        .with_ansi(false);

    // Fails only when a global subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
