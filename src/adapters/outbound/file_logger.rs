use crate::domains::logger::{DynLogger, LogLevel, SdkLogger};
use chrono::Utc;
use std::sync::Arc;

/// Forwards to the `log` facade, which `fast_log` writes to a file.
struct FileBridge;

impl SdkLogger for FileBridge {
    fn debug(&self, msg: &str) {
        log::debug!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn info(&self, msg: &str) {
        log::info!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{} - {}", Utc::now().to_rfc3339(), msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{} - {}", Utc::now().to_rfc3339(), msg);
    }
}

/// Initialize the process-wide fast_log file appender and return a logger the
/// application can inject. Fails if a `log` backend is already installed.
pub fn init_file_logger(path: &str, level: LogLevel) -> Result<DynLogger, String> {
    fast_log::init(
        fast_log::config::Config::new()
            .file(path)
            .level(level.to_level_filter()),
    )
    .map_err(|e| format!("Failed to initialize fast_log: {}", e))?;
    Ok(Arc::new(FileBridge {}))
}
