use crate::domains::logger::{DynLogger, SdkLogger};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct TracingBridge;

impl SdkLogger for TracingBridge {
    fn debug(&self, msg: &str) {
        tracing::debug!(target: "tongsim", "{}", msg);
    }

    fn info(&self, msg: &str) {
        tracing::info!(target: "tongsim", "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(target: "tongsim", "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(target: "tongsim", "{}", msg);
    }
}

/// Logger that emits `tracing` events under the `tongsim` target.
pub fn init_tracing_logger() -> DynLogger {
    Arc::new(TracingBridge {})
}

/// Install a fmt subscriber filtered by `filter` (e.g. `"tongsim=debug"`).
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(filter: &str) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| format!("invalid tracing filter: {}", e))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| format!("failed to install tracing subscriber: {}", e))
}
