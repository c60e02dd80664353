//! Shared domain types for Spaces.
//!
//! This crate contains the core domain types used across the Spaces workspace:
//! conversations ("spaces") and their turns, LLM request shapes, agent task
//! wire types, classified thoughts, session events, configuration, and the
//! error enums shared by every layer.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod space;
pub mod task;
pub mod thought;
