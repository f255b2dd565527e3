//! Logging setup
//!
//! `tracing` everywhere; a `tracing-subscriber` formatter filtered by
//! `RUST_LOG` (default `info`) is installed once per process.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global subscriber. Safe to call more than once; later calls are no-ops,
/// and an already-installed subscriber (e.g. from a test harness) is left in place.
pub fn init_logging() {
    INIT.call_once(|| {
        let result = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .try_init();

        if result.is_ok() {
            tracing::info!("📝 Initialized tracing logging");
        }
    });
}

#[macro_export]
macro_rules! log_order {
    ($action:expr, $order_id:expr, $symbol:expr) => {
        tracing::info!("📋 ORDER {}: {} ({})", $action, $order_id, $symbol);
    };
}

#[macro_export]
macro_rules! log_error {
    ($operation:expr, $error:expr) => {
        tracing::error!("❌ {} failed: {}", $operation, $error);
    };
}
