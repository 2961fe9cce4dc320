use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("[AsyncLoop {name}] already running")]
    AlreadyRunning { name: String },

    #[error("[AsyncLoop {name}] not started")]
    NotRunning { name: String },

    #[error("[AsyncLoop {name}] timeout starting event loop")]
    StartTimeout { name: String },

    #[error("[AsyncLoop {name}] failed to spawn loop thread: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[AsyncLoop {name}] failed to build runtime: {reason}")]
    RuntimeBuild { name: String, reason: String },
}

/// Outcome of a unit of work submitted to an `AsyncLoop`, as seen by the waiter.
///
/// `Failed` carries the work's own error value unchanged.
#[derive(Error, Debug)]
pub enum TaskError<E> {
    #[error("task failed: {0}")]
    Failed(E),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was cancelled")]
    Cancelled,

    #[error("timed out waiting for task result")]
    Timeout,
}

impl<E> TaskError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout)
    }

    /// The work's own error, if the task failed by returning one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ContextError<E> {
    #[error("cannot call `sync_run` from the thread of AsyncLoop [{loop_name}]: this would deadlock")]
    WouldDeadlock { loop_name: String },

    #[error("{0}")]
    Loop(LoopError),

    #[error("{0}")]
    Task(TaskError<E>),
}

impl<E> From<LoopError> for ContextError<E> {
    fn from(err: LoopError) -> Self {
        ContextError::Loop(err)
    }
}

impl<E> From<TaskError<E>> for ContextError<E> {
    fn from(err: TaskError<E>) -> Self {
        ContextError::Task(err)
    }
}

impl<E> ContextError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ContextError::Task(TaskError::Timeout))
    }

    pub fn into_failure(self) -> Option<E> {
        match self {
            ContextError::Task(task) => task.into_failure(),
            _ => None,
        }
    }
}

/// Failure while constructing a `WorldContext`.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error("failed to connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: TaskError<ConnectionError>,
    },
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    Closed,

    #[error("remote error: {0}")]
    Remote(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("stream not started")]
    StreamNotStarted,

    #[error("stream already started")]
    StreamAlreadyStarted,
}

/// Failure of one typed API call.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{method} failed: {source}")]
    Call {
        method: &'static str,
        #[source]
        source: ConnectionError,
    },

    #[error("{method} timed out after {timeout:?}")]
    Timeout { method: &'static str, timeout: Duration },

    #[error("{method}: cannot encode request: {source}")]
    Encode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{method}: malformed reply: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The session could not run the call at all.
    #[error(transparent)]
    Session(#[from] ContextError<Infallible>),
}

impl ApiError {
    pub fn method(&self) -> Option<&'static str> {
        match self {
            ApiError::Call { method, .. }
            | ApiError::Timeout { method, .. }
            | ApiError::Encode { method, .. }
            | ApiError::Decode { method, .. } => Some(*method),
            ApiError::Session(_) => None,
        }
    }

    /// The server answered with an error message.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Call {
                source: ConnectionError::Remote(msg),
                ..
            } => Some(msg),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("cannot invert transform with zero scale: ({x}, {y}, {z})")]
    ZeroScale { x: f64, y: f64, z: f64 },
}

#[derive(Error, Debug)]
pub enum EntityError {
    #[error("entity {entity} has no capability {capability}")]
    MissingCapability {
        entity: String,
        capability: &'static str,
    },
}

pub type ConnectionResult<T> = Result<T, ConnectionError>;
