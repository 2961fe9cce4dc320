use crate::domains::logger::{DynLogger, LogLevel, SdkLogger};
use crossbeam_channel::{Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

struct LogMessage {
    level: LogLevel,
    msg: String,
}

/// Non-blocking logger: messages are handed to a drain thread that forwards
/// them to `sink`, so a slow sink never stalls the loop thread.
/// Messages are dropped when the buffer of `capacity` entries is full.
pub struct BufferedLogger {
    sender: Sender<LogMessage>,
    dropped: AtomicU64,
}

impl BufferedLogger {
    /// Number of messages discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn push(&self, level: LogLevel, msg: &str) {
        let message = LogMessage {
            level,
            msg: msg.to_string(),
        };
        if let Err(TrySendError::Full(_)) = self.sender.try_send(message) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl SdkLogger for BufferedLogger {
    fn debug(&self, msg: &str) {
        self.push(LogLevel::Debug, msg);
    }

    fn info(&self, msg: &str) {
        self.push(LogLevel::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(LogLevel::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(LogLevel::Error, msg);
    }
}

/// The drain thread exits once every clone of the returned logger is dropped.
pub fn init_buffered_logger(sink: DynLogger, capacity: usize) -> Arc<BufferedLogger> {
    let (tx, rx) = crossbeam_channel::bounded::<LogMessage>(capacity.max(1));

    let spawned = thread::Builder::new()
        .name("tongsim-log-drain".to_string())
        .spawn({
            let sink = sink.clone();
            move || {
                for message in rx {
                    match message.level {
                        LogLevel::Debug => sink.debug(&message.msg),
                        LogLevel::Info => sink.info(&message.msg),
                        LogLevel::Warn => sink.warn(&message.msg),
                        LogLevel::Error => sink.error(&message.msg),
                        LogLevel::Off => {}
                    }
                }
            }
        });
    if let Err(e) = spawned {
        sink.warn(&format!("buffered logger unavailable, messages will be dropped: {}", e));
    }

    Arc::new(BufferedLogger {
        sender: tx,
        dropped: AtomicU64::new(0),
    })
}
