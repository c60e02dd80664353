//! Completion model providers.

pub mod anthropic;
