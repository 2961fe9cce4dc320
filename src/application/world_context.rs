use crate::application::async_loop::{AsyncLoop, DEFAULT_START_TIMEOUT, DEFAULT_STOP_TIMEOUT};
use crate::application::task::TaskHandle;
use crate::common::{ConnectError, ContextError, LoopError};
use crate::domains::connection::{Connector, DynConnection};
use crate::domains::logger::{DynLogger, LogLevel, ModuleLogger, SdkLogger};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Timeouts and log level for one `WorldContext`.
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub start_timeout: Duration,
    /// Bound on establishing the connection; `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    pub cancel_timeout: Duration,
    pub close_timeout: Duration,
    pub stop_timeout: Duration,
    pub log_level: LogLevel,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_START_TIMEOUT,
            connect_timeout: Some(Duration::from_secs(10)),
            cancel_timeout: Duration::from_secs(1),
            close_timeout: Duration::from_secs(1),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            log_level: LogLevel::default(),
        }
    }
}

/// Runtime resources of one simulation session: the dedicated `AsyncLoop` and
/// the connection established on it.
///
/// Work reaches the connection only through [`WorldContext::sync_run`] and
/// [`WorldContext::async_task`], which hand it a clone of the connection
/// handle on the loop thread. Teardown order is fixed: cancel business tasks,
/// close the connection, stop the loop.
pub struct WorldContext {
    id: Uuid,
    endpoint: String,
    event_loop: AsyncLoop,
    conn: DynConnection,
    released: AtomicBool,
    settings: ContextSettings,
    logger: ModuleLogger,
}

impl WorldContext {
    /// Start the loop and establish the connection on it, blocking until done.
    pub fn new(
        endpoint: &str,
        connector: Arc<dyn Connector>,
        logger: DynLogger,
        settings: ContextSettings,
    ) -> Result<Self, ConnectError> {
        let id = Uuid::new_v4();
        let short = short_id(&id);
        let log = ModuleLogger::new(logger.clone(), "world", settings.log_level);

        let event_loop = AsyncLoop::new(&format!("world-main-loop-{}", id), logger, settings.log_level);
        event_loop.start(settings.start_timeout)?;

        let target = endpoint.to_string();
        let init = event_loop.spawn(
            async move { connector.connect(&target).await },
            &format!("[WorldContext {} connect]", short),
        );
        let conn = match init {
            Ok(handle) => handle.wait(settings.connect_timeout),
            Err(e) => {
                event_loop.stop(settings.stop_timeout);
                return Err(ConnectError::Loop(e));
            }
        };
        let conn = match conn {
            Ok(conn) => conn,
            Err(source) => {
                log.error(&format!("[WorldContext {}] connection to {} failed: {}", short, endpoint, source));
                event_loop.stop(settings.stop_timeout);
                return Err(ConnectError::Connection {
                    endpoint: endpoint.to_string(),
                    source,
                });
            }
        };

        log.debug(&format!("[WorldContext {}] started.", id));
        Ok(Self {
            id,
            endpoint: endpoint.to_string(),
            event_loop,
            conn,
            released: AtomicBool::new(false),
            settings,
            logger: log,
        })
    }

    /// Short identifier (first eight characters) for this world instance.
    pub fn uuid(&self) -> String {
        short_id(&self.id)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn event_loop(&self) -> &AsyncLoop {
        &self.event_loop
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// Logger for an SDK module working on behalf of this session.
    pub fn module_logger(&self, module: &str) -> ModuleLogger {
        self.logger.for_module(module)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Run `work` on the loop and block until it finishes or `timeout` elapses.
    ///
    /// `work` receives the connection handle and builds the future that runs
    /// on the loop thread. Calling this from the loop thread itself is
    /// rejected with `ContextError::WouldDeadlock`. A timeout does not cancel
    /// the work. Note that an `Err` from `work` counts as a task failure and
    /// takes the whole session down with it.
    pub fn sync_run<F, Fut, T, E>(&self, work: F, timeout: Option<Duration>) -> Result<T, ContextError<E>>
    where
        F: FnOnce(DynConnection) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        if self.event_loop.is_loop_thread() {
            return Err(ContextError::WouldDeadlock {
                loop_name: self.event_loop.name().to_string(),
            });
        }

        let handle = self.event_loop.spawn(
            work(self.conn.clone()),
            &format!("[World-Context {} sync task]", self.uuid()),
        )?;
        handle.wait(timeout).map_err(ContextError::Task)
    }

    /// Schedule `work` on the loop without waiting for it.
    pub fn async_task<F, Fut, T, E>(&self, work: F, name: &str) -> Result<TaskHandle<T, E>, LoopError>
    where
        F: FnOnce(DynConnection) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        self.event_loop.spawn(work(self.conn.clone()), name)
    }

    /// Release all managed resources. Only the first call does anything and
    /// errors are logged, never returned.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.logger.debug(&format!("[WorldContext {}] releasing...", self.id));

        if self.event_loop.is_loop_thread() {
            self.logger.warn(&format!(
                "[WorldContext {}] released from its own loop thread; connection close skipped.",
                self.id
            ));
            self.event_loop.stop(self.settings.stop_timeout);
            return;
        }

        self.event_loop.cancel_tasks(self.settings.cancel_timeout);

        let conn = self.conn.clone();
        let closed = self
            .event_loop
            .spawn(
                async move { conn.close().await },
                &format!("WorldContext {} release connection", self.uuid()),
            )
            .map_err(|e| e.to_string())
            .and_then(|handle| {
                handle
                    .wait(Some(self.settings.close_timeout))
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = closed {
            self.logger.warn(&format!(
                "[WorldContext {}] failed to release cleanly: {}",
                self.id, e
            ));
        }

        self.event_loop.stop(self.settings.stop_timeout);
        self.logger.debug(&format!("[WorldContext {}] release complete.", self.id));
    }
}

impl Drop for WorldContext {
    fn drop(&mut self) {
        self.logger.debug(&format!("[WorldContext {}] dropped.", self.id));
        self.release();
    }
}

impl fmt::Debug for WorldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldContext")
            .field("id", &self.uuid())
            .field("endpoint", &self.endpoint)
            .field("released", &self.is_released())
            .finish()
    }
}

fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
