//! Classified agent thoughts.

use serde::{Deserialize, Serialize};

/// Structural category of a raw thought, decided by content markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtKind {
    /// The agent's summary of its own reasoning.
    Reasoning,
    /// The agent announced how many tools it selected.
    ToolSelection,
    /// A tool notice that is not a completion.
    ToolActivity,
    /// A tool finished and reported its result.
    ToolResult,
    /// Matched no marker; kept in the raw log only.
    Unclassified,
}

/// A raw thought together with its rendering decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedThought {
    pub raw: String,
    pub kind: ThoughtKind,
    pub display_text: String,
}

impl ClassifiedThought {
    /// Whether the thought belongs in the rendered "thinking" panel.
    pub fn is_significant(&self) -> bool {
        self.kind != ThoughtKind::Unclassified
    }
}
