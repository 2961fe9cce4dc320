#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tongsim_lite::{
    BidiStream, Connection, ConnectionError, ConnectionResult, Connector, ContextSettings, DynConnection,
    LogLevel, ModuleLogger, SdkLogger, WorldContext,
};

pub struct BridgeCapture {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl BridgeCapture {
    pub fn new() -> Self {
        Self { messages: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn count(&self, needle: &str) -> usize {
        self.messages.lock().unwrap().iter().filter(|m| m.contains(needle)).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count(needle) > 0
    }
}

impl SdkLogger for BridgeCapture {
    fn debug(&self, msg: &str) { self.messages.lock().unwrap().push(format!("DEBUG:{}", msg)); }
    fn info(&self, msg: &str) { self.messages.lock().unwrap().push(format!("INFO:{}", msg)); }
    fn warn(&self, msg: &str) { self.messages.lock().unwrap().push(format!("WARN:{}", msg)); }
    fn error(&self, msg: &str) { self.messages.lock().unwrap().push(format!("ERR:{}", msg)); }
}

/// Shared, ordered record of what happened during a test.
#[derive(Clone, Default)]
pub struct Journal(pub Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: &str) {
        self.0.lock().unwrap().push(entry.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Records an entry when dropped, e.g. when a cancelled task's future is torn down.
pub struct DropRecorder {
    journal: Journal,
    entry: &'static str,
}

impl DropRecorder {
    pub fn new(journal: &Journal, entry: &'static str) -> Self {
        Self { journal: journal.clone(), entry }
    }
}

impl Drop for DropRecorder {
    fn drop(&mut self) {
        self.journal.push(self.entry);
    }
}

pub struct FakeConnection {
    endpoint: String,
    journal: Journal,
    pub close_calls: AtomicUsize,
    pub close_thread: Mutex<Option<ThreadId>>,
}

#[async_trait]
impl Connection for FakeConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, request: Vec<u8>) -> ConnectionResult<Vec<u8>> {
        self.journal.push(&format!("call:{}", method));
        match method {
            "fail" => Err(ConnectionError::Remote("rejected".to_string())),
            _ => Ok(request),
        }
    }

    async fn open_stream(&self, method: &str) -> ConnectionResult<BidiStream<Vec<u8>, Vec<u8>>> {
        let logger = ModuleLogger::new(tongsim_lite::adapters::outbound::init_noop_logger(), "stream", LogLevel::Off);
        let (stream, mut peer) = BidiStream::channel(method, logger, 8);
        tokio::spawn(async move {
            while let Some(msg) = peer.requests.recv().await {
                if peer.responses.send(msg).await.is_err() {
                    break;
                }
            }
        });
        Ok(stream)
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        *self.close_thread.lock().unwrap() = Some(thread::current().id());
        self.journal.push("close");
        Ok(())
    }
}

pub struct FakeConnector {
    pub journal: Journal,
    pub fail: bool,
    pub connect_thread: Arc<Mutex<Option<ThreadId>>>,
    pub connection: Arc<Mutex<Option<Arc<FakeConnection>>>>,
}

impl FakeConnector {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail: false,
            connect_thread: Arc::new(Mutex::new(None)),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing(journal: &Journal) -> Self {
        Self { fail: true, ..Self::new(journal) }
    }

    pub fn connection(&self) -> Arc<FakeConnection> {
        self.connection.lock().unwrap().clone().expect("connector was never used")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, endpoint: &str) -> ConnectionResult<DynConnection> {
        *self.connect_thread.lock().unwrap() = Some(thread::current().id());
        tokio::task::yield_now().await;
        if self.fail {
            return Err(ConnectionError::Remote(format!("{} refused", endpoint)));
        }
        self.journal.push("connect");
        let conn = Arc::new(FakeConnection {
            endpoint: endpoint.to_string(),
            journal: self.journal.clone(),
            close_calls: AtomicUsize::new(0),
            close_thread: Mutex::new(None),
        });
        *self.connection.lock().unwrap() = Some(conn.clone());
        Ok(conn)
    }
}

pub fn fast_settings(level: LogLevel) -> ContextSettings {
    ContextSettings {
        stop_timeout: Duration::from_secs(2),
        log_level: level,
        ..ContextSettings::default()
    }
}

/// A connected context over the fake connector, plus its journal and logger.
pub fn fake_context(level: LogLevel) -> (WorldContext, Arc<FakeConnector>, Journal, Arc<BridgeCapture>) {
    let journal = Journal::default();
    let connector = Arc::new(FakeConnector::new(&journal));
    let capture = Arc::new(BridgeCapture::new());
    let ctx = WorldContext::new("fake:5726", connector.clone(), capture.clone(), fast_settings(level))
        .expect("fake connection should succeed");
    (ctx, connector, journal, capture)
}
