use crate::adapters::outbound::{init_console_logger, init_file_logger};
use crate::domains::logger::{DynLogger, LogLevel, SdkLogger};
use std::sync::Arc;

/// Fans every message out to each attached sink, in attach order.
#[derive(Default)]
pub struct MultiLogger {
    sinks: Vec<DynLogger>,
}

impl MultiLogger {
    pub fn new(sinks: Vec<DynLogger>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: DynLogger) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SdkLogger for MultiLogger {
    fn debug(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.debug(msg));
    }
    fn info(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.info(msg));
    }
    fn warn(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.warn(msg));
    }
    fn error(&self, msg: &str) {
        self.sinks.iter().for_each(|sink| sink.error(msg));
    }
}

/// File plus console at `level`. If the file cannot be opened the console
/// alone is returned and says so.
pub fn init_combined_logger(path: &str, level: LogLevel) -> DynLogger {
    let console = init_console_logger(level);
    match init_file_logger(path, level) {
        Ok(file) => Arc::new(MultiLogger::new(vec![file, console])),
        Err(e) => {
            console.warn(&format!("[TongSim_Lite] file logging to {} disabled: {}", path, e));
            console
        }
    }
}
