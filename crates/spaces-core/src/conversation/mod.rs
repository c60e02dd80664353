//! Conversation orchestration: the live transcript view and the coordinator
//! that routes each submission through exactly one reply path.

pub mod orchestrator;
pub mod view;

pub use orchestrator::{ConversationSession, Orchestrator, OrchestratorSettings, SubmitOutcome};
pub use view::{TranscriptView, ViewEntry};
