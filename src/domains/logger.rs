use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// SDK logging port (Hexagonal port).
/// Components receive one at construction instead of reaching for a global registry.
pub trait SdkLogger: Send + Sync + 'static {
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

pub type DynLogger = Arc<dyn SdkLogger>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// A named, independently levelled view over a shared sink.
///
/// Messages are prefixed with `[TongSim_Lite][<module>]`. Clones share the level,
/// so `set_level` on one clone affects every holder of that module logger.
#[derive(Clone)]
pub struct ModuleLogger {
    module: Arc<str>,
    level: Arc<AtomicU8>,
    sink: DynLogger,
}

impl ModuleLogger {
    pub fn new(sink: DynLogger, module: &str, level: LogLevel) -> Self {
        Self {
            module: Arc::from(module),
            level: Arc::new(AtomicU8::new(level as u8)),
            sink,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// A logger for `module` on the same sink, starting at this logger's level.
    pub fn for_module(&self, module: &str) -> ModuleLogger {
        ModuleLogger::new(self.sink.clone(), module, self.level())
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    fn format(&self, msg: &str) -> String {
        format!("[TongSim_Lite][{}] {}", self.module, msg)
    }
}

impl SdkLogger for ModuleLogger {
    fn debug(&self, msg: &str) {
        if self.enabled(LogLevel::Debug) {
            self.sink.debug(&self.format(msg));
        }
    }

    fn info(&self, msg: &str) {
        if self.enabled(LogLevel::Info) {
            self.sink.info(&self.format(msg));
        }
    }

    fn warn(&self, msg: &str) {
        if self.enabled(LogLevel::Warn) {
            self.sink.warn(&self.format(msg));
        }
    }

    fn error(&self, msg: &str) {
        if self.enabled(LogLevel::Error) {
            self.sink.error(&self.format(msg));
        }
    }
}

impl fmt::Debug for ModuleLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLogger")
            .field("module", &self.module)
            .field("level", &self.level())
            .finish()
    }
}
