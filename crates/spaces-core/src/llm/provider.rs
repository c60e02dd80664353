//! LlmProvider trait definition.
//!
//! This is the abstraction every completion backend implements. It consumes
//! an ordered role/content transcript and returns a single text completion
//! or fails.

use spaces_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for completion-model backends (Anthropic, test doubles, ...).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in spaces-infra (e.g., `AnthropicProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
