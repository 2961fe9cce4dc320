use crate::domains::logger::{DynLogger, LogLevel, SdkLogger};
use std::sync::Arc;

/// Terminal sink. Lines look like `14:02:07.215 WARN  message`; warnings and
/// errors go to stderr so they survive stdout redirection.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    threshold: LogLevel,
}

impl ConsoleLogger {
    pub fn new(threshold: LogLevel) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    fn emit(&self, level: LogLevel, msg: &str) {
        if level < self.threshold {
            return;
        }
        let line = console_line(level, msg);
        if level >= LogLevel::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

fn console_line(level: LogLevel, msg: &str) -> String {
    format!(
        "{} {:<5} {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        level.as_str().to_ascii_uppercase(),
        msg
    )
}

impl SdkLogger for ConsoleLogger {
    fn debug(&self, msg: &str) {
        self.emit(LogLevel::Debug, msg)
    }
    fn info(&self, msg: &str) {
        self.emit(LogLevel::Info, msg)
    }
    fn warn(&self, msg: &str) {
        self.emit(LogLevel::Warn, msg)
    }
    fn error(&self, msg: &str) {
        self.emit(LogLevel::Error, msg)
    }
}

/// Console sink that drops anything below `threshold`.
pub fn init_console_logger(threshold: LogLevel) -> DynLogger {
    Arc::new(ConsoleLogger::new(threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_carries_time_level_and_message() {
        let line = console_line(LogLevel::Warn, "[TongSim_Lite][core] slow start");
        let (time, rest) = line.split_once(' ').unwrap();
        assert_eq!(time.len(), "00:00:00.000".len());
        assert_eq!(rest, "WARN  [TongSim_Lite][core] slow start");
    }

    #[test]
    fn default_threshold_lets_everything_through() {
        assert_eq!(ConsoleLogger::default().threshold(), LogLevel::Debug);
        assert_eq!(ConsoleLogger::new(LogLevel::Off).threshold(), LogLevel::Off);
    }
}
