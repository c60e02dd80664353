//! Business logic and port trait definitions for Spaces.
//!
//! This crate defines the "ports" (repository, completion-model, and task
//! backend traits) that the infrastructure layer implements, plus everything
//! built on top of them: the transcript store, the direct reply invoker, the
//! task launcher and poller, the thought classifier, and the conversation
//! orchestrator. It depends only on `spaces-types` -- never on
//! `spaces-infra` or any database/IO crate.

pub mod conversation;
pub mod event;
pub mod llm;
pub mod reply;
pub mod space;
pub mod task;
pub mod thought;

#[cfg(test)]
pub(crate) mod testutil;
