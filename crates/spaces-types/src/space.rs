//! Conversation ("space") and turn types for Spaces.
//!
//! A space is a single chat thread owned by one identity. Turns are
//! append-only and ordered by creation time: that order is the only ordering
//! signal consumers may rely on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Number of prompt characters used for a newly created space's title.
pub const TITLE_FROM_PROMPT_CHARS: usize = 100;

/// Maximum length (in characters) of a title chosen by the owner.
pub const MAX_TITLE_CHARS: usize = 50;

/// Maximum length (in characters) of a single turn's content.
pub const MAX_TURN_CHARS: usize = 32_000;

/// Who produced a turn.
///
/// `System` turns are synthesized by the orchestrator (task failures) and are
/// never sent back to the completion model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            "system" => Ok(TurnRole::System),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// The identity on whose behalf a call is made.
///
/// Supplied by the external identity provider as an opaque, stable id and
/// passed explicitly into every store and orchestrator call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerContext {
    pub owner_id: String,
}

impl CallerContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub initial_prompt: String,
    /// Favorited ("saved") by the owner.
    pub saved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Space {
    /// Build a new space from its originating prompt.
    pub fn from_prompt(owner_id: &str, prompt: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner_id: owner_id.to_string(),
            title: derive_title(prompt),
            initial_prompt: prompt.to_string(),
            saved: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single role-tagged message within a space. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub space_id: Uuid,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(space_id: Uuid, role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            space_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A space together with its most recent turn, used by listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceSummary {
    pub space: Space,
    pub last_turn: Option<Turn>,
}

/// A space with its full ordered transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceWithTurns {
    pub space: Space,
    pub turns: Vec<Turn>,
}

/// Take the first `TITLE_FROM_PROMPT_CHARS` characters of a prompt.
pub fn derive_title(prompt: &str) -> String {
    prompt.chars().take(TITLE_FROM_PROMPT_CHARS).collect()
}
