//! In-memory transcript view for one conversation.
//!
//! Holds durable turns in store order, optimistic turns awaiting store
//! confirmation, and the ephemeral state of a running task (thoughts and
//! snapshot). Ephemeral state is never persisted and is cleared when the
//! task reaches a terminal state.

use serde::Serialize;
use spaces_types::space::{Turn, TurnRole};
use spaces_types::task::Snapshot;
use spaces_types::thought::ClassifiedThought;
use uuid::Uuid;

/// One row of the rendered transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewEntry {
    /// Shown immediately, not yet confirmed by the store.
    Pending {
        local_id: u64,
        role: TurnRole,
        content: String,
    },
    Durable(Turn),
}

impl ViewEntry {
    pub fn role(&self) -> TurnRole {
        match self {
            ViewEntry::Pending { role, .. } => *role,
            ViewEntry::Durable(turn) => turn.role,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ViewEntry::Pending { content, .. } => content,
            ViewEntry::Durable(turn) => &turn.content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptView {
    space_id: Uuid,
    entries: Vec<ViewEntry>,
    next_local_id: u64,
    /// Every thought of the running task, significant or not.
    raw_thoughts: Vec<String>,
    /// Significant thoughts only, for the thinking panel.
    thoughts: Vec<ClassifiedThought>,
    snapshot: Option<Snapshot>,
    /// Error indicator left by a rolled-back turn.
    banner: Option<String>,
}

impl TranscriptView {
    pub fn new(space_id: Uuid) -> Self {
        Self {
            space_id,
            entries: Vec::new(),
            next_local_id: 1,
            raw_thoughts: Vec::new(),
            thoughts: Vec::new(),
            snapshot: None,
            banner: None,
        }
    }

    /// Build a view from turns already read from the store.
    pub fn with_turns(space_id: Uuid, turns: Vec<Turn>) -> Self {
        let mut view = Self::new(space_id);
        view.entries = turns.into_iter().map(ViewEntry::Durable).collect();
        view
    }

    pub fn space_id(&self) -> Uuid {
        self.space_id
    }

    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    /// Confirmed turns, in store order.
    pub fn durable_turns(&self) -> Vec<Turn> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ViewEntry::Durable(turn) => Some(turn.clone()),
                ViewEntry::Pending { .. } => None,
            })
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ViewEntry::Pending { .. }))
            .count()
    }

    /// Show a turn before the store has confirmed it. Returns its local id.
    pub fn push_pending(&mut self, role: TurnRole, content: &str) -> u64 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.banner = None;
        self.entries.push(ViewEntry::Pending {
            local_id,
            role,
            content: content.to_string(),
        });
        local_id
    }

    /// Replace a pending turn with its durable form.
    ///
    /// Returns `false` if no pending turn has that id.
    pub fn confirm(&mut self, local_id: u64, turn: Turn) -> bool {
        let Some(entry) = self.find_pending(local_id) else {
            return false;
        };
        *entry = ViewEntry::Durable(turn);
        true
    }

    /// Drop a pending turn the store refused and raise the error banner.
    pub fn rollback(&mut self, local_id: u64, error: impl Into<String>) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e, ViewEntry::Pending { local_id: id, .. } if *id == local_id));
        let removed = self.entries.len() != before;
        if removed {
            self.banner = Some(error.into());
        }
        removed
    }

    /// Append a turn that is already durable.
    pub fn append_durable(&mut self, turn: Turn) {
        self.entries.push(ViewEntry::Durable(turn));
    }

    /// Record newly arrived thoughts. Non-significant ones go to the raw log only.
    pub fn record_thoughts(&mut self, thoughts: &[ClassifiedThought]) {
        for thought in thoughts {
            self.raw_thoughts.push(thought.raw.clone());
            if thought.is_significant() {
                self.thoughts.push(thought.clone());
            }
        }
    }

    pub fn raw_thoughts(&self) -> &[String] {
        &self.raw_thoughts
    }

    pub fn thoughts(&self) -> &[ClassifiedThought] {
        &self.thoughts
    }

    pub fn set_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = Some(snapshot);
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Discard thoughts and snapshot of the finished task.
    pub fn clear_ephemeral(&mut self) {
        self.raw_thoughts.clear();
        self.thoughts.clear();
        self.snapshot = None;
    }

    fn find_pending(&mut self, local_id: u64) -> Option<&mut ViewEntry> {
        self.entries
            .iter_mut()
            .find(|e| matches!(e, ViewEntry::Pending { local_id: id, .. } if *id == local_id))
    }
}
