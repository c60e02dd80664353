//! HTTP client for the out-of-process agent runner.
//!
//! `POST {base}/api/prompt` submits a prompt; `GET {base}/api/tasks/{id}`
//! reports the run's state. Every request carries the configured timeout, so
//! a stalled backend surfaces as a transport error instead of hanging a poll.

use std::time::Duration;

use reqwest::Url;
use spaces_core::task::backend::TaskBackend;
use spaces_types::config::TaskConfig;
use spaces_types::error::TaskError;
use spaces_types::task::{SubmitRequest, SubmitResponse, TaskHandle, TaskStatusResponse};

/// `TaskBackend` over HTTP + JSON.
#[derive(Debug, Clone)]
pub struct HttpTaskBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTaskBackend {
    /// Create a backend client from the `[task]` config section.
    pub fn new(config: &TaskConfig) -> Result<Self, TaskError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TaskError::Transport(format!("invalid task backend URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TaskError::Transport(format!(
                "invalid task backend URL: {}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| TaskError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TaskError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TaskError::Transport("task backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn transport(context: &str, e: reqwest::Error) -> TaskError {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_decode() {
        "malformed response"
    } else {
        "request failed"
    };
    TaskError::Transport(format!("{context} {kind}: {e}"))
}

impl TaskBackend for HttpTaskBackend {
    async fn submit(&self, prompt: &str) -> Result<SubmitResponse, TaskError> {
        let url = self.endpoint(&["api", "prompt"])?;
        let response = self
            .client
            .post(url)
            .json(&SubmitRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await
            .map_err(|e| transport("task submission", e))?;

        let status = response.status();
        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| transport("task submission", e))?;
        tracing::debug!(http_status = status.as_u16(), status = %body.status, "Task submission answered");
        Ok(body)
    }

    async fn status(&self, handle: &TaskHandle) -> Result<TaskStatusResponse, TaskError> {
        let url = self.endpoint(&["api", "tasks", handle.as_str()])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport("status query", e))?;

        let status = response.status();
        let body: TaskStatusResponse = response
            .json()
            .await
            .map_err(|e| transport("status query", e))?;
        tracing::trace!(
            http_status = status.as_u16(),
            thoughts = body.thoughts.as_ref().map_or(0, Vec::len),
            "Status query answered"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use spaces_types::task::TaskState;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn backend(base_url: &str) -> HttpTaskBackend {
        HttpTaskBackend::new(&TaskConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 2,
            ..TaskConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn submit_posts_prompt() {
        let app = Router::new().route(
            "/api/prompt",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["prompt"], "Capital of Nepal?");
                Json(json!({
                    "status": "success",
                    "message": "Prompt received and processing started with ID: abc123"
                }))
            }),
        );
        let base = serve(app).await;

        let resp = backend(&base).submit("Capital of Nepal?").await.unwrap();
        assert_eq!(resp.status, "success");
        assert!(resp.message.ends_with("abc123"));
    }

    #[tokio::test]
    async fn rejected_submission_still_decodes() {
        let app = Router::new().route(
            "/api/prompt",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"status": "error", "message": "No prompt provided"})),
                )
            }),
        );
        let base = serve(app).await;

        let resp = backend(&base).submit("x").await.unwrap();
        assert_eq!(resp.status, "error");
        assert_eq!(resp.message, "No prompt provided");
    }

    #[tokio::test]
    async fn status_returns_cumulative_thoughts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/api/tasks/{id}",
                get(
                    |State(calls): State<Arc<AtomicUsize>>, Path(id): Path<String>| async move {
                        assert_eq!(id, "abc123");
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        if n == 0 {
                            Json(json!({"status": "processing", "thoughts": ["t1"]}))
                        } else {
                            Json(json!({
                                "status": "success",
                                "thoughts": ["t1", "t2"],
                                "results": "done",
                                "browser_screenshot": "/9j/4AAQ"
                            }))
                        }
                    },
                ),
            )
            .with_state(Arc::clone(&calls));
        let base = serve(app).await;
        let backend = backend(&base);
        let handle = TaskHandle::new("abc123").unwrap();

        let first = backend.status(&handle).await.unwrap();
        assert_eq!(first.status, TaskState::InProgress("processing".to_string()));
        assert_eq!(first.thoughts, Some(vec!["t1".to_string()]));

        let second = backend.status(&handle).await.unwrap();
        assert_eq!(second.status, TaskState::Success);
        assert_eq!(second.results.as_deref(), Some("done"));
        assert_eq!(second.browser_screenshot.as_deref(), Some("/9j/4AAQ"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_status_is_transport_error() {
        let app = Router::new().route("/api/tasks/{id}", get(|| async { "<html>oops</html>" }));
        let base = serve(app).await;

        let err = backend(&base)
            .status(&TaskHandle::new("t").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = backend(&format!("http://{addr}")).submit("x").await.unwrap_err();
        assert!(matches!(err, TaskError::Transport(_)));
    }

    #[test]
    fn endpoint_respects_base_path_and_escapes_ids() {
        let backend = backend("http://localhost:8000/agent/");
        let url = backend.endpoint(&["api", "tasks", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/agent/api/tasks/a%2Fb%20c");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTaskBackend::new(&TaskConfig {
            base_url: "not a url".to_string(),
            ..TaskConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, TaskError::Transport(_)));
    }
}
