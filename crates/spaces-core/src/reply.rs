//! Direct reply invoker: the synchronous request/response path.
//!
//! Given the durable transcript of a space and a new user message, builds a
//! role-mapped history and asks the completion model for exactly one
//! assistant reply. Failures are returned typed; the orchestrator decides how
//! to absorb them.

use std::time::Instant;

use spaces_types::config::ModelConfig;
use spaces_types::llm::{CompletionRequest, LlmError, Message};
use spaces_types::space::{Turn, TurnRole};
use tracing::{debug, warn};

use crate::llm::box_provider::BoxLlmProvider;

/// Model parameters for direct replies.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    pub model: String,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl From<&ModelConfig> for ReplySettings {
    fn from(config: &ModelConfig) -> Self {
        let system_prompt = if config.system_prompt.trim().is_empty() {
            None
        } else {
            Some(config.system_prompt.clone())
        };
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }
}

/// Bridges a transcript to the completion model.
pub struct DirectReplyInvoker {
    provider: BoxLlmProvider,
    settings: ReplySettings,
}

impl DirectReplyInvoker {
    pub fn new(provider: BoxLlmProvider, settings: ReplySettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &ReplySettings {
        &self.settings
    }

    /// Ask the model for a reply to `new_user_text`, given the prior turns.
    #[tracing::instrument(
        name = "direct_reply",
        skip(self, prefix, new_user_text),
        fields(provider = %self.provider.name(), model = %self.settings.model, history = prefix.len())
    )]
    pub async fn reply(&self, prefix: &[Turn], new_user_text: &str) -> Result<String, LlmError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: build_history(prefix, new_user_text),
            system: self.settings.system_prompt.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: None,
        };

        let start = Instant::now();
        let response = self.provider.complete(&request).await.inspect_err(|e| {
            warn!(error = %e, "Completion model call failed");
        })?;

        let content = response.content.trim();
        if content.is_empty() {
            warn!(stop_reason = %response.stop_reason, "Completion contained no text");
            return Err(LlmError::EmptyCompletion);
        }

        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Direct reply received"
        );
        Ok(response.content)
    }
}

/// Map durable turns to model messages and append the new user text last.
///
/// System turns are synthesized notices and never reach the model.
pub fn build_history(prefix: &[Turn], new_user_text: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = prefix
        .iter()
        .filter_map(|turn| match turn.role {
            TurnRole::User => Some(Message::user(turn.content.clone())),
            TurnRole::Assistant => Some(Message::assistant(turn.content.clone())),
            TurnRole::System => None,
        })
        .collect();
    messages.push(Message::user(new_user_text));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedLlm;
    use spaces_types::llm::MessageRole;
    use uuid::Uuid;

    fn settings() -> ReplySettings {
        ReplySettings::from(&ModelConfig::default())
    }

    #[test]
    fn history_skips_system_turns_and_ends_with_new_text() {
        let space_id = Uuid::now_v7();
        let prefix = vec![
            Turn::new(space_id, TurnRole::User, "What is Rust?"),
            Turn::new(space_id, TurnRole::Assistant, "A systems language."),
            Turn::new(space_id, TurnRole::System, "Error: task failed"),
        ];

        let history = build_history(&prefix, "Tell me more");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[2], Message::user("Tell me more"));
    }

    #[test]
    fn settings_from_config_drops_blank_system_prompt() {
        let mut config = ModelConfig::default();
        config.system_prompt = "  ".to_string();
        assert!(ReplySettings::from(&config).system_prompt.is_none());
        assert!(settings().system_prompt.unwrap().contains("Manus"));
    }

    #[tokio::test]
    async fn reply_sends_full_request() {
        let llm = ScriptedLlm::replying("Hi! How can I help?");
        let seen = llm.requests();
        let invoker = DirectReplyInvoker::new(BoxLlmProvider::new(llm), settings());

        let reply = invoker.reply(&[], "Hello").await.unwrap();
        assert_eq!(reply, "Hi! How can I help?");

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "claude-3-haiku-20240307");
        assert_eq!(requests[0].max_tokens, 1000);
        assert_eq!(requests[0].messages, vec![Message::user("Hello")]);
    }

    #[tokio::test]
    async fn reply_propagates_model_error() {
        let invoker =
            DirectReplyInvoker::new(BoxLlmProvider::new(ScriptedLlm::failing()), settings());
        let err = invoker.reply(&[], "Hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(_)));
    }

    #[tokio::test]
    async fn blank_completion_is_an_error() {
        let invoker =
            DirectReplyInvoker::new(BoxLlmProvider::new(ScriptedLlm::replying("   ")), settings());
        let err = invoker.reply(&[], "Hello").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyCompletion));
    }
}
