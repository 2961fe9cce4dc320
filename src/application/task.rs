use crate::common::TaskError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::time::Duration;

pub(crate) type Outcome<T, E> = Result<T, TaskError<E>>;

/// Create the two halves of a cross-thread result slot.
///
/// The slot holds at most one outcome; whoever settles first wins and later
/// sends are dropped without blocking the loop thread.
pub(crate) fn task_channel<T, E>(seq: u64, name: &str) -> (TaskHandle<T, E>, TaskSender<T, E>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let handle = TaskHandle {
        seq,
        name: name.to_string(),
        rx,
        settled: None,
    };
    (handle, TaskSender { tx })
}

pub(crate) struct TaskSender<T, E> {
    tx: Sender<Outcome<T, E>>,
}

impl<T, E> TaskSender<T, E> {
    pub(crate) fn settle(&self, outcome: Outcome<T, E>) {
        let _ = self.tx.try_send(outcome);
    }
}

impl<T, E> Clone for TaskSender<T, E> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

/// Cross-thread future for one unit of work submitted to an `AsyncLoop`.
///
/// If the loop goes away without settling the task (thread exit, queued work
/// dropped on shutdown) the handle resolves as `Cancelled`.
pub struct TaskHandle<T, E> {
    seq: u64,
    name: String,
    rx: Receiver<Outcome<T, E>>,
    settled: Option<Outcome<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Sequence number assigned at submission, unique per loop.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&mut self) -> bool {
        self.poll_settled();
        self.settled.is_some()
    }

    pub fn is_cancelled(&mut self) -> bool {
        self.poll_settled();
        matches!(self.settled, Some(Err(TaskError::Cancelled)))
    }

    /// Block until the task settles or `timeout` elapses, without consuming the handle.
    /// Returns whether the task has settled.
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        if self.settled.is_none() {
            match self.rx.recv_timeout(timeout) {
                Ok(outcome) => self.settled = Some(outcome),
                Err(RecvTimeoutError::Disconnected) => self.settled = Some(Err(TaskError::Cancelled)),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
        self.settled.is_some()
    }

    /// Take the outcome if the task already settled.
    pub fn try_take(&mut self) -> Option<Outcome<T, E>> {
        self.poll_settled();
        self.settled.take()
    }

    /// Block until the task settles. With `Some(timeout)` a late task yields
    /// `TaskError::Timeout`; the work itself keeps running.
    pub fn wait(mut self, timeout: Option<Duration>) -> Outcome<T, E> {
        if let Some(outcome) = self.settled.take() {
            return outcome;
        }
        let received = match timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => TaskError::Timeout,
                RecvTimeoutError::Disconnected => TaskError::Cancelled,
            }),
            None => self.rx.recv().map_err(|_| TaskError::Cancelled),
        };
        received.and_then(|outcome| outcome)
    }

    fn poll_settled(&mut self) {
        if self.settled.is_some() {
            return;
        }
        match self.rx.try_recv() {
            Ok(outcome) => self.settled = Some(outcome),
            Err(TryRecvError::Disconnected) => self.settled = Some(Err(TaskError::Cancelled)),
            Err(TryRecvError::Empty) => {}
        }
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("seq", &self.seq)
            .field("name", &self.name)
            .field("settled", &self.settled.is_some())
            .finish()
    }
}
