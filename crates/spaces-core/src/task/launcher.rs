//! Task launcher: fire-and-forget submission of agent runs.

use spaces_types::error::LaunchError;
use spaces_types::task::{SubmitResponse, TaskHandle};
use tracing::{info, warn};

use super::backend::TaskBackend;

/// Starts agent runs and returns their handles without waiting for completion.
pub struct TaskLauncher<B: TaskBackend> {
    backend: B,
}

impl<B: TaskBackend> TaskLauncher<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend, shared with the poller.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Submit `prompt` and return the new run's handle.
    #[tracing::instrument(name = "task_launch", skip(self, prompt), fields(prompt_chars = prompt.chars().count()))]
    pub async fn launch(&self, prompt: &str) -> Result<TaskHandle, LaunchError> {
        let response = self.backend.submit(prompt).await.inspect_err(|e| {
            warn!(error = %e, "Task submission failed");
        })?;

        if response.status != "success" {
            warn!(status = %response.status, message = %response.message, "Task backend rejected prompt");
            return Err(LaunchError::Rejected(response.message));
        }

        let handle = extract_handle(&response)?;
        info!(task_id = %handle, "Task launched");
        Ok(handle)
    }
}

/// Pull the task id out of a successful submission response.
///
/// A structured `task_id` wins. Otherwise the id is read from the message
/// text after its last colon (`"... started with ID: task_1"`).
pub fn extract_handle(response: &SubmitResponse) -> Result<TaskHandle, LaunchError> {
    if let Some(handle) = response.task_id.as_deref().and_then(TaskHandle::new) {
        return Ok(handle);
    }

    response
        .message
        .rsplit_once(':')
        .and_then(|(_, id)| TaskHandle::new(id))
        .ok_or_else(|| LaunchError::MalformedHandle(response.message.clone()))
}
