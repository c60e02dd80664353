//! Infrastructure layer for Spaces.
//!
//! Contains implementations of the port traits defined in `spaces-core`:
//! SQLite storage for spaces and turns, the Anthropic Messages API provider,
//! and the HTTP agent task backend. Also loads `config.toml` and resolves the
//! data directory.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod task;
