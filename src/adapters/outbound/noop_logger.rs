use crate::domains::logger::{DynLogger, SdkLogger};
use std::sync::Arc;

/// Discards everything. Handy where a component needs a sink but the caller
/// does not care, e.g. in-process streams in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl SdkLogger for NoopLogger {
    fn debug(&self, _: &str) {}
    fn info(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

pub fn init_noop_logger() -> DynLogger {
    Arc::new(NoopLogger)
}
