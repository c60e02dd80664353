use thiserror::Error;

/// Errors from repository operations (used by trait definitions in spaces-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the transcript store.
///
/// `Validation` and `NotFound` are raised before any durable side effect.
#[derive(Debug, Error)]
pub enum SpaceError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("space not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for SpaceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => SpaceError::NotFound,
            other => SpaceError::Storage(other.to_string()),
        }
    }
}

/// Errors from an agent task backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The backend answered, but reported a failure.
    #[error("task backend error: {0}")]
    Upstream(String),

    /// The request never produced a usable response (connect, timeout, decode).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Why a task could not be launched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("prompt rejected: {0}")]
    Rejected(String),

    #[error("task backend unreachable: {0}")]
    Unreachable(String),

    #[error("could not extract a task id from '{0}'")]
    MalformedHandle(String),
}

impl From<TaskError> for LaunchError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Upstream(msg) => LaunchError::Rejected(msg),
            TaskError::Transport(msg) => LaunchError::Unreachable(msg),
        }
    }
}

/// Errors returned to the caller of a conversation submission.
///
/// Reply-path failures are never reported here: they are absorbed into a
/// synthesized turn. Only failures that prevent the user's turn from being
/// recorded (or the reply from being written) surface.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("space not found")]
    NotFound,

    #[error("a reply is already in progress for this space")]
    Busy,

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<SpaceError> for SubmitError {
    fn from(e: SpaceError) -> Self {
        match e {
            SpaceError::Validation(msg) => SubmitError::Validation(msg),
            SpaceError::NotFound => SubmitError::NotFound,
            SpaceError::Storage(msg) => SubmitError::Storage(msg),
        }
    }
}
