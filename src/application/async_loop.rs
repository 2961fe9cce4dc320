//! A cooperative scheduler hosted on a dedicated OS thread.
//!
//! [`AsyncLoop`] owns one current-thread tokio runtime running on its own
//! thread. Other threads push work into it with [`AsyncLoop::spawn`] and
//! observe the outcome through a [`TaskHandle`]. Everything the runtime owns
//! (the task scope, connection-bound async state) stays on that one thread;
//! callers only ever reach it through the command queue.
//!
//! The supervisor future plays the role of the root task. It owns the
//! structured scope of business tasks and applies one policy: an unhandled
//! failure in any business task cancels the supervisor, which unwinds every
//! sibling and ends the loop.

use crate::application::task::{task_channel, TaskHandle, TaskSender};
use crate::common::{LoopError, TaskError};
use crate::domains::logger::{DynLogger, LogLevel, ModuleLogger, SdkLogger};
use crossbeam_channel::RecvTimeoutError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::{Id, JoinError, JoinSet};

pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(2);
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

type Job = Box<dyn FnOnce(&mut TaskScope) + Send>;

enum Command {
    Spawn(Job),
    CancelTasks(crossbeam_channel::Sender<usize>),
    Snapshot(crossbeam_channel::Sender<Vec<TaskInfo>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Cancelling,
}

/// Diagnostic view of one tracked business task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub seq: u64,
    pub name: String,
    pub state: TaskState,
}

struct LoopThread {
    handle: JoinHandle<()>,
    thread_id: ThreadId,
    commands: mpsc::UnboundedSender<Command>,
    root: watch::Sender<bool>,
}

pub struct AsyncLoop {
    name: String,
    logger: ModuleLogger,
    inner: Mutex<Option<LoopThread>>,
    next_seq: AtomicU64,
}

impl AsyncLoop {
    pub fn new(name: &str, logger: DynLogger, level: LogLevel) -> Self {
        Self {
            name: name.to_string(),
            logger: ModuleLogger::new(logger, "core", level),
            inner: Mutex::new(None),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch the loop thread and wait for the task scope to become ready.
    pub fn start(&self, timeout: Duration) -> Result<(), LoopError> {
        let mut guard = self.lock();
        if guard.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Err(LoopError::AlreadyRunning {
                name: self.name.clone(),
            });
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (root_tx, root_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let loop_name = self.name.clone();
        let logger = self.logger.clone();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run_loop(loop_name, logger, cmd_rx, root_rx, ready_tx))
            .map_err(|source| LoopError::ThreadSpawn {
                name: self.name.clone(),
                source,
            })?;

        let thread_id = handle.thread().id();
        *guard = Some(LoopThread {
            handle,
            thread_id,
            commands: cmd_tx,
            root: root_tx,
        });
        drop(guard);

        self.finish_start(ready_rx.recv_timeout(timeout), timeout)
    }

    /// Turn the loop thread's readiness report into the result of `start`.
    fn finish_start(
        &self,
        readiness: Result<Result<(), String>, RecvTimeoutError>,
        timeout: Duration,
    ) -> Result<(), LoopError> {
        match readiness {
            Ok(Ok(())) => {
                self.logger.debug(&format!("[AsyncLoop {}] started.", self.name));
                Ok(())
            }
            Ok(Err(reason)) => {
                self.discard_thread();
                Err(LoopError::RuntimeBuild {
                    name: self.name.clone(),
                    reason,
                })
            }
            Err(RecvTimeoutError::Timeout) => {
                // The thread may still come up; tell it to wind down and let it go.
                if let Some(thread) = self.lock().take() {
                    let _ = thread.root.send(true);
                }
                self.logger.warn(&format!(
                    "[AsyncLoop {}] not ready within {:?}; abandoning start.",
                    self.name, timeout
                ));
                Err(LoopError::StartTimeout {
                    name: self.name.clone(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.discard_thread();
                Err(LoopError::RuntimeBuild {
                    name: self.name.clone(),
                    reason: "loop thread exited before signalling readiness".to_string(),
                })
            }
        }
    }

    /// Submit `work` to the task scope.
    ///
    /// The returned handle resolves with the work's value, with
    /// `TaskError::Failed` carrying its error unchanged, or with `Cancelled`.
    /// A failure also cancels the whole scope: sibling tasks are cancelled and
    /// the loop shuts down.
    pub fn spawn<F, T, E>(&self, work: F, name: &str) -> Result<TaskHandle<T, E>, LoopError>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let commands = self.command_sender()?;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (handle, sender) = task_channel(seq, name);

        let task_name = name.to_string();
        let job: Job = Box::new(move |scope: &mut TaskScope| scope.spawn(seq, task_name, work, sender));
        commands
            .send(Command::Spawn(job))
            .map_err(|_| LoopError::NotRunning {
                name: self.name.clone(),
            })?;
        Ok(handle)
    }

    /// Cancel every tracked business task and wait for them to unwind.
    ///
    /// Best effort: on timeout a warning is logged and the call returns while
    /// cancellation may still be in progress.
    pub fn cancel_tasks(&self, timeout: Duration) {
        if self.is_loop_thread() {
            self.logger.warn(&format!(
                "[AsyncLoop {}] cancel_tasks called from the loop thread; skipped.",
                self.name
            ));
            return;
        }
        let Ok(commands) = self.command_sender() else {
            return;
        };

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if commands.send(Command::CancelTasks(done_tx)).is_err() {
            return;
        }
        match done_rx.recv_timeout(timeout) {
            Ok(count) => self.logger.debug(&format!(
                "[AsyncLoop {}] {} business task(s) cancelled.",
                self.name, count
            )),
            Err(RecvTimeoutError::Timeout) => {
                self.logger.warn(&format!("[AsyncLoop {}] cancel_tasks timeout.", self.name))
            }
            Err(RecvTimeoutError::Disconnected) => {}
        }
    }

    /// Cancel the root task, then join the loop thread for up to `timeout`.
    ///
    /// The thread reference is cleared either way; a thread that does not exit
    /// in time is left detached and reported with a warning.
    pub fn stop(&self, timeout: Duration) {
        let Some(thread) = self.lock().take() else {
            return;
        };

        if thread.handle.is_finished() {
            let _ = thread.handle.join();
            return;
        }

        let _ = thread.root.send(true);

        if thread.thread_id == thread::current().id() {
            self.logger.debug(&format!(
                "[AsyncLoop {}] stop requested from the loop thread; not joining.",
                self.name
            ));
            return;
        }

        let deadline = Instant::now() + timeout;
        while !thread.handle.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        if thread.handle.is_finished() {
            if thread.handle.join().is_err() {
                self.logger
                    .warn(&format!("[AsyncLoop {}] loop thread panicked.", self.name));
            }
            self.logger.debug(&format!("[AsyncLoop {}] stopped.", self.name));
        } else {
            self.logger
                .warn(&format!("AsyncLoop '{}' did not exit cleanly.", self.name));
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|t| !t.handle.is_finished())
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.lock().as_ref().map(|t| t.thread_id)
    }

    /// Whether the calling thread is this loop's worker thread.
    pub fn is_loop_thread(&self) -> bool {
        self.thread_id() == Some(thread::current().id())
    }

    /// Tasks currently tracked by the scope, ordered by submission.
    pub fn task_snapshot(&self, timeout: Duration) -> Vec<TaskInfo> {
        if self.is_loop_thread() {
            return Vec::new();
        }
        let Ok(commands) = self.command_sender() else {
            return Vec::new();
        };
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        if commands.send(Command::Snapshot(reply_tx)).is_err() {
            return Vec::new();
        }
        reply_rx.recv_timeout(timeout).unwrap_or_default()
    }

    /// Log every tracked task at warn level, for diagnosing stuck sessions.
    pub fn log_task_list(&self) {
        let tasks = self.task_snapshot(Duration::from_secs(1));
        self.logger.warn(&format!(
            "[AsyncLoop {}] {} active task(s):",
            self.name,
            tasks.len()
        ));
        for task in tasks {
            let state = match task.state {
                TaskState::Pending => "pending",
                TaskState::Cancelling => "cancelling",
            };
            self.logger
                .warn(&format!("  - #{} {} [{}]", task.seq, task.name, state));
        }
    }

    fn command_sender(&self) -> Result<mpsc::UnboundedSender<Command>, LoopError> {
        match self.lock().as_ref() {
            Some(t) if !t.handle.is_finished() => Ok(t.commands.clone()),
            _ => Err(LoopError::NotRunning {
                name: self.name.clone(),
            }),
        }
    }

    fn discard_thread(&self) {
        if let Some(thread) = self.lock().take() {
            let _ = thread.root.send(true);
            let _ = thread.handle.join();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<LoopThread>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AsyncLoop {
    fn drop(&mut self) {
        self.logger
            .debug(&format!("[AsyncLoop {}] dropped, attempting cleanup.", self.name));
        self.stop(DEFAULT_STOP_TIMEOUT);
    }
}

impl fmt::Debug for AsyncLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncLoop")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_loop(
    name: String,
    logger: ModuleLogger,
    commands: mpsc::UnboundedReceiver<Command>,
    root: watch::Receiver<bool>,
    ready: crossbeam_channel::Sender<Result<(), String>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    let scope = TaskScope::new(name.clone(), logger.clone());
    runtime.block_on(supervise(scope, commands, root, ready));

    // Anything spawned straight onto the runtime, outside the scope, is dropped here.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    logger.debug(&format!("[AsyncLoop {}] loop closed.", name));
}

/// Root task: keeps the scope alive until cancelled, a business task fails,
/// or the owning `AsyncLoop` disappears.
async fn supervise(
    mut scope: TaskScope,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut root: watch::Receiver<bool>,
    ready: crossbeam_channel::Sender<Result<(), String>>,
) {
    let _ = ready.send(Ok(()));

    loop {
        tokio::select! {
            biased;

            _ = root.changed() => {
                scope.logger.debug(&format!(
                    "[AsyncLoop {}] main task cancelled; shutting down task scope.",
                    scope.loop_name
                ));
                break;
            }
            Some(joined) = scope.tasks.join_next_with_id(), if !scope.tasks.is_empty() => {
                if scope.settle(joined) == Flow::Abort {
                    break;
                }
            }
            command = commands.recv() => match command {
                Some(command) => scope.handle(command),
                None => break,
            },
        }
    }

    scope.shutdown().await;
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Abort,
}

enum TaskFault {
    Cancelled,
    Panicked(String),
}

struct TaskEntry {
    seq: u64,
    name: String,
    state: TaskState,
    report: Box<dyn FnOnce(TaskFault) + Send>,
}

struct CancelWaiter {
    pending: HashSet<Id>,
    cancelled: usize,
    done: crossbeam_channel::Sender<usize>,
}

/// The structured group of business tasks. Lives on the loop thread only.
struct TaskScope {
    loop_name: String,
    logger: ModuleLogger,
    tasks: JoinSet<Result<(), String>>,
    entries: HashMap<Id, TaskEntry>,
    cancel_waiters: Vec<CancelWaiter>,
}

impl TaskScope {
    fn new(loop_name: String, logger: ModuleLogger) -> Self {
        Self {
            loop_name,
            logger,
            tasks: JoinSet::new(),
            entries: HashMap::new(),
            cancel_waiters: Vec::new(),
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Spawn(job) => job(self),
            Command::CancelTasks(done) => self.cancel_all(done),
            Command::Snapshot(reply) => {
                let _ = reply.try_send(self.snapshot());
            }
        }
    }

    fn spawn<F, T, E>(&mut self, seq: u64, name: String, work: F, sender: TaskSender<T, E>)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let reporter = sender.clone();
        let abort = self.tasks.spawn(async move {
            match work.await {
                Ok(value) => {
                    sender.settle(Ok(value));
                    Ok(())
                }
                Err(err) => {
                    let msg = err.to_string();
                    sender.settle(Err(TaskError::Failed(err)));
                    Err(msg)
                }
            }
        });

        self.entries.insert(
            abort.id(),
            TaskEntry {
                seq,
                name,
                state: TaskState::Pending,
                report: Box::new(move |fault| {
                    reporter.settle(Err(match fault {
                        TaskFault::Cancelled => TaskError::Cancelled,
                        TaskFault::Panicked(msg) => TaskError::Panicked(msg),
                    }))
                }),
            },
        );
    }

    /// Completion callback for one business task.
    fn settle(&mut self, joined: Result<(Id, Result<(), String>), JoinError>) -> Flow {
        let id = match &joined {
            Ok((id, _)) => *id,
            Err(err) => err.id(),
        };
        let entry = self.entries.remove(&id);
        self.release_cancel_waiters(id);
        let Some(entry) = entry else {
            return Flow::Continue;
        };

        match joined {
            Ok((_, Ok(()))) => Flow::Continue,
            Ok((_, Err(msg))) => {
                self.logger.error(&format!(
                    "[AsyncLoop {}] Task {:?} raised: {}",
                    self.loop_name, entry.name, msg
                ));
                Flow::Abort
            }
            Err(err) if err.is_cancelled() => {
                (entry.report)(TaskFault::Cancelled);
                Flow::Continue
            }
            Err(err) => {
                let msg = panic_message(err);
                self.logger.error(&format!(
                    "[AsyncLoop {}] Task {:?} panicked: {}",
                    self.loop_name, entry.name, msg
                ));
                (entry.report)(TaskFault::Panicked(msg));
                Flow::Abort
            }
        }
    }

    fn cancel_all(&mut self, done: crossbeam_channel::Sender<usize>) {
        let pending: HashSet<Id> = self.entries.keys().copied().collect();
        self.logger.debug(&format!(
            "[AsyncLoop {}] cancelling {} business task(s).",
            self.loop_name,
            pending.len()
        ));
        if pending.is_empty() {
            let _ = done.try_send(0);
            return;
        }

        for entry in self.entries.values_mut() {
            entry.state = TaskState::Cancelling;
        }
        self.tasks.abort_all();
        self.cancel_waiters.push(CancelWaiter {
            cancelled: pending.len(),
            pending,
            done,
        });
    }

    fn release_cancel_waiters(&mut self, id: Id) {
        self.cancel_waiters.retain_mut(|waiter| {
            waiter.pending.remove(&id);
            if waiter.pending.is_empty() {
                let _ = waiter.done.try_send(waiter.cancelled);
                false
            } else {
                true
            }
        });
    }

    fn snapshot(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<TaskInfo> = self
            .entries
            .values()
            .map(|entry| TaskInfo {
                seq: entry.seq,
                name: entry.name.clone(),
                state: entry.state,
            })
            .collect();
        tasks.sort_by_key(|task| task.seq);
        tasks
    }

    /// Cancel everything still in the scope and wait for it to unwind.
    async fn shutdown(&mut self) {
        if !self.entries.is_empty() {
            self.logger.debug(&format!(
                "[AsyncLoop {}] cancelling {} remaining task(s).",
                self.loop_name,
                self.entries.len()
            ));
        }
        self.tasks.abort_all();
        while let Some(joined) = self.tasks.join_next_with_id().await {
            let _ = self.settle(joined);
        }
        for waiter in self.cancel_waiters.drain(..) {
            let _ = waiter.done.try_send(waiter.cancelled);
        }
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => {
            if let Some(msg) = payload.downcast_ref::<&str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "non-string panic payload".to_string()
            }
        }
        Err(err) => err.to_string(),
    }
}
