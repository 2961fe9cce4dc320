use crate::adapters::outbound::{init_combined_logger, init_console_logger};
use crate::application::world_context::ContextSettings;
use crate::domains::logger::{DynLogger, LogLevel};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub endpoint: String,
    pub log_level: LogLevel,
    /// When set, logs also go to this file.
    pub log_file: Option<String>,
    pub timeouts: TimeoutConfig,
}

/// All values in milliseconds. A `connect_ms` of 0 waits for the
/// connection without a bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub start_ms: u64,
    pub connect_ms: u64,
    pub cancel_ms: u64,
    pub close_ms: u64,
    pub stop_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            start_ms: 1_000,
            connect_ms: 10_000,
            cancel_ms: 1_000,
            close_ms: 1_000,
            stop_ms: 5_000,
        }
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            endpoint: crate::application::DEFAULT_ENDPOINT.to_string(),
            log_level: LogLevel::Warn,
            log_file: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl SdkConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SdkConfig = toml::from_str(content).context("invalid SDK configuration")?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Layer an optional TOML file and `TONGSIM_*` environment variables
    /// (nested keys use `__`, e.g. `TONGSIM_TIMEOUTS__STOP_MS`) over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("TONGSIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to assemble SDK configuration")?;
        let config: SdkConfig = settings
            .try_deserialize()
            .context("invalid SDK configuration")?;
        Ok(config)
    }

    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            start_timeout: Duration::from_millis(self.timeouts.start_ms),
            connect_timeout: (self.timeouts.connect_ms > 0).then(|| Duration::from_millis(self.timeouts.connect_ms)),
            cancel_timeout: Duration::from_millis(self.timeouts.cancel_ms),
            close_timeout: Duration::from_millis(self.timeouts.close_ms),
            stop_timeout: Duration::from_millis(self.timeouts.stop_ms),
            log_level: self.log_level,
        }
    }

    /// Console logger, or file + console when `log_file` is set.
    pub fn build_logger(&self) -> DynLogger {
        match &self.log_file {
            Some(path) => init_combined_logger(path, self.log_level),
            None => init_console_logger(self.log_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_timeout() {
        let config = SdkConfig::default();
        assert_eq!(config.endpoint, "127.0.0.1:5726");
        let settings = config.context_settings();
        assert_eq!(settings.start_timeout, Duration::from_secs(1));
        assert_eq!(settings.cancel_timeout, Duration::from_secs(1));
        assert_eq!(settings.close_timeout, Duration::from_secs(1));
        assert_eq!(settings.stop_timeout, Duration::from_secs(5));
        assert_eq!(settings.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn zero_connect_timeout_means_unbounded() {
        let config = SdkConfig::from_toml_str("[timeouts]\nconnect_ms = 0\n").unwrap();
        assert_eq!(config.timeouts.connect_ms, 0);
        assert_eq!(config.context_settings().connect_timeout, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SdkConfig::from_toml_str(
            r#"
            endpoint = "10.0.0.2:6000"
            log_level = "debug"

            [timeouts]
            stop_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "10.0.0.2:6000");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.timeouts.stop_ms, 250);
        assert_eq!(config.timeouts.start_ms, 1_000);
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(SdkConfig::from_toml_str("log_level = \"loud\"").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tongsim.toml");
        std::fs::write(&path, "endpoint = \"sim.local:7000\"\n").unwrap();

        let config = SdkConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.endpoint, "sim.local:7000");
        assert_eq!(config.timeouts, TimeoutConfig::default());
    }
}
