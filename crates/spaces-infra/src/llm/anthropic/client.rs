//! AnthropicProvider -- concrete [`LlmProvider`] for the Anthropic Messages API.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is only exposed
//! when building request headers. It never appears in `Debug` output or logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use spaces_core::llm::provider::LlmProvider;
use spaces_types::config::ModelConfig;
use spaces_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, StopReason, Usage,
};

use super::types::{
    AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse, ErrorPayload,
};

/// Anthropic Claude completion provider.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a provider from the `[model]` config section.
    pub fn new(api_key: SecretString, config: &ModelConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Override the base URL (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into an [`AnthropicRequest`].
    ///
    /// The Messages API requires the conversation to open with a user turn
    /// and to alternate roles, so leading assistant messages are dropped and
    /// consecutive same-role messages are merged.
    fn to_anthropic_request(request: &CompletionRequest) -> AnthropicRequest {
        let mut messages: Vec<AnthropicMessage> = Vec::with_capacity(request.messages.len());
        for message in request
            .messages
            .iter()
            .skip_while(|m| m.role == MessageRole::Assistant)
        {
            let role = message.role.to_string();
            match messages.last_mut() {
                Some(last) if last.role == role => {
                    last.content.push_str("\n\n");
                    last.content.push_str(&message.content);
                }
                _ => messages.push(AnthropicMessage {
                    role,
                    content: message.content.clone(),
                }),
            }
        }

        AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages,
            system: request.system.clone(),
            temperature: request.temperature,
        }
    }
}

fn map_status(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorPayload>(body)
        .map(|p| p.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        400 => LlmError::InvalidRequest(message),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        529 => LlmError::Overloaded(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_anthropic_request(request);
        if body.messages.is_empty() {
            return Err(LlmError::InvalidRequest("no user message to send".to_string()));
        }

        let response = self
            .client
            .post(self.url("/v1/messages"))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Provider {
                        message: format!("HTTP request failed: {e}"),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Anthropic request failed");
            return Err(map_status(status, &error_body));
        }

        let anthropic_resp: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let content = anthropic_resp
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let stop_reason = match anthropic_resp.stop_reason.as_deref() {
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            Some("tool_use") => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        };

        tracing::debug!(
            model = %anthropic_resp.model,
            input_tokens = anthropic_resp.usage.input_tokens,
            output_tokens = anthropic_resp.usage.output_tokens,
            "Anthropic completion received"
        );

        Ok(CompletionResponse {
            id: anthropic_resp.id,
            content,
            model: anthropic_resp.model,
            stop_reason,
            usage: Usage {
                input_tokens: anthropic_resp.usage.input_tokens,
                output_tokens: anthropic_resp.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use spaces_types::llm::Message;

    fn request(messages: Vec<Message>) -> CompletionRequest {
        CompletionRequest {
            model: "claude-3-haiku-20240307".to_string(),
            messages,
            system: Some("Be helpful".to_string()),
            max_tokens: 1000,
            temperature: None,
        }
    }

    fn provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new(SecretString::from("test-key-not-real"), &ModelConfig::default())
            .unwrap()
            .with_base_url(base_url)
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn leading_assistant_messages_are_dropped() {
        let req = request(vec![
            Message::assistant("Hello! I'm Manus."),
            Message::user("Hi"),
            Message::assistant("How can I help?"),
            Message::user("first"),
            Message::user("second"),
        ]);
        let body = AnthropicProvider::to_anthropic_request(&req);

        let roles: Vec<&str> = body.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(body.messages[2].content, "first\n\nsecond");
        assert_eq!(body.system.as_deref(), Some("Be helpful"));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimited { .. }
        ));
        let overloaded = map_status(
            StatusCode::from_u16(529).unwrap(),
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );
        assert!(matches!(overloaded, LlmError::Overloaded(m) if m == "Overloaded"));
        assert!(matches!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            LlmError::Provider { .. }
        ));
    }

    #[test]
    fn base_url_override_trims_slash() {
        let p = provider("http://localhost:8080/");
        assert_eq!(p.url("/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[tokio::test]
    async fn complete_against_fake_server() {
        let app = Router::new().route(
            "/v1/messages",
            post(|headers: HeaderMap, body: axum::Json<serde_json::Value>| async move {
                assert_eq!(headers["x-api-key"], "test-key-not-real");
                assert_eq!(headers["anthropic-version"], "2023-06-01");
                assert_eq!(body["messages"][0]["content"], "Hello");
                axum::Json(serde_json::json!({
                    "id": "msg_01",
                    "type": "message",
                    "role": "assistant",
                    "model": "claude-3-haiku-20240307",
                    "content": [{"type": "text", "text": "Hi! "}, {"type": "text", "text": "How can I help?"}],
                    "stop_reason": "end_turn",
                    "usage": {"input_tokens": 9, "output_tokens": 6}
                }))
            }),
        );
        let base = serve(app).await;

        let resp = provider(&base)
            .complete(&request(vec![Message::user("Hello")]))
            .await
            .unwrap();
        assert_eq!(resp.content, "Hi! How can I help?");
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
        assert_eq!(resp.usage.output_tokens, 6);
    }

    #[tokio::test]
    async fn complete_maps_overload() {
        let app = Router::new().route(
            "/v1/messages",
            post(|| async {
                (
                    StatusCode::from_u16(529).unwrap(),
                    r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
                )
            }),
        );
        let base = serve(app).await;

        let err = provider(&base)
            .complete(&request(vec![Message::user("Hello")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Overloaded(_)));
    }

    #[tokio::test]
    async fn only_assistant_messages_is_invalid() {
        let err = provider("http://127.0.0.1:9")
            .complete(&request(vec![Message::assistant("hello")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }
}
