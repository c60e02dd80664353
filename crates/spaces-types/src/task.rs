//! Agent task wire types and polling lifecycle types.
//!
//! The task backend is an out-of-process agent runner reachable over HTTP:
//! `POST /api/prompt` starts a run, `GET /api/tasks/{id}` reports its state.
//! Status responses carry the *cumulative* thought history on every call.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a running agent task.
///
/// Valid only for the lifetime of the backing run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    /// Wrap a raw id. Returns `None` for a blank id.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of a task submission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,
}

/// Body of a task submission response.
///
/// On success the task id is embedded in `message` after a colon
/// (`"... started with ID: task_1"`). A structured `task_id` field, when a
/// backend supplies one, takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Status tag reported by the task backend.
///
/// Anything other than `success` or `error` is an in-progress marker
/// (the reference backend uses `processing`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    InProgress(String),
    Success,
    Error,
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => TaskState::Success,
            "error" => TaskState::Error,
            _ => TaskState::InProgress(s),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::InProgress(marker) => marker,
            TaskState::Success => "success".to_string(),
            TaskState::Error => "error".to_string(),
        }
    }
}

/// Body of a task status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub status: TaskState,
    /// Full thought history so far (not a delta).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<String>,
    /// Base64-encoded JPEG of the agent's browser, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskStatusResponse {
    pub fn in_progress(thoughts: Vec<String>) -> Self {
        Self {
            status: TaskState::InProgress("processing".to_string()),
            thoughts: Some(thoughts),
            results: None,
            browser_screenshot: None,
            message: None,
        }
    }

    pub fn success(thoughts: Vec<String>, results: impl Into<String>) -> Self {
        Self {
            status: TaskState::Success,
            thoughts: Some(thoughts),
            results: Some(results.into()),
            browser_screenshot: None,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskState::Error,
            thoughts: None,
            results: None,
            browser_screenshot: None,
            message: Some(message.into()),
        }
    }
}

/// Latest visual aid surfaced by a running task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub jpeg_base64: String,
}

impl Snapshot {
    /// Decode the image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(self.jpeg_base64.trim())
    }
}

/// Lifecycle state of a task poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    Idle,
    Polling,
    Succeeded,
    Failed,
    Abandoned,
}

impl PollerState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollerState::Succeeded | PollerState::Failed | PollerState::Abandoned
        )
    }
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollerState::Idle => write!(f, "idle"),
            PollerState::Polling => write!(f, "polling"),
            PollerState::Succeeded => write!(f, "succeeded"),
            PollerState::Failed => write!(f, "failed"),
            PollerState::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Why a polling session failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The backend reported `status: error`.
    Upstream,
    /// A poll request failed or its response could not be decoded.
    Transport,
    /// The task did not reach a terminal state within the polling deadline.
    Deadline,
}

/// The single terminal event of a polling session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    Succeeded {
        result: String,
        /// Full thought history carried by the terminal response.
        thoughts: Vec<String>,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
    Abandoned,
}

impl PollOutcome {
    pub fn state(&self) -> PollerState {
        match self {
            PollOutcome::Succeeded { .. } => PollerState::Succeeded,
            PollOutcome::Failed { .. } => PollerState::Failed,
            PollOutcome::Abandoned => PollerState::Abandoned,
        }
    }
}
