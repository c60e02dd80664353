//! Session events published by the conversation orchestrator.
//!
//! Renderers subscribe to these to follow a conversation live: optimistic
//! turns, their confirmation or rollback, streamed thoughts, and task
//! lifecycle notices.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::space::{Turn, TurnRole};
use crate::task::{PollerState, TaskHandle};
use crate::thought::ClassifiedThought;

/// Which path produced (or will produce) the reply to a user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyRoute {
    /// Synchronous completion-model call.
    Direct,
    /// Long-running agent task observed by polling.
    Task,
}

impl std::str::FromStr for ReplyRoute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(ReplyRoute::Direct),
            "task" => Ok(ReplyRoute::Task),
            other => Err(format!("invalid reply route: '{other}'")),
        }
    }
}

/// Events emitted while a conversation is being driven.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A turn was shown optimistically, before the store confirmed it.
    TurnPending {
        space_id: Uuid,
        local_id: u64,
        role: TurnRole,
        content: String,
    },

    /// A turn is durable.
    TurnCommitted {
        local_id: Option<u64>,
        turn: Turn,
    },

    /// The store refused an optimistic turn; it was removed from the view.
    TurnRolledBack {
        space_id: Uuid,
        local_id: u64,
        error: String,
    },

    /// An agent task was accepted by the backend.
    TaskStarted { space_id: Uuid, task_id: TaskHandle },

    /// New thoughts arrived from the running task.
    ThoughtsReceived {
        space_id: Uuid,
        thoughts: Vec<ClassifiedThought>,
    },

    /// The task's visual aid changed.
    SnapshotUpdated { space_id: Uuid, bytes_base64: usize },

    /// The task's polling session reached a terminal state.
    TaskFinished {
        space_id: Uuid,
        task_id: TaskHandle,
        state: PollerState,
    },

    /// A reply path failed and was absorbed into a synthesized turn.
    ReplyFailed {
        space_id: Uuid,
        route: ReplyRoute,
        error: String,
    },
}
