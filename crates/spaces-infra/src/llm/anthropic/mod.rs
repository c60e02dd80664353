//! Anthropic Claude provider for the direct reply path.
//!
//! [`AnthropicProvider`] implements
//! [`LlmProvider`](spaces_core::llm::provider::LlmProvider) over the
//! non-streaming Anthropic Messages API.

pub mod client;
pub mod types;

pub use client::AnthropicProvider;
