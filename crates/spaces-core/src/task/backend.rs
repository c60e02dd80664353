//! TaskBackend trait definition.

use spaces_types::error::TaskError;
use spaces_types::task::{SubmitResponse, TaskHandle, TaskStatusResponse};

/// Port to the out-of-process agent runner.
///
/// Both calls are fallible remote calls. A response that cannot be decoded
/// is a `TaskError::Transport`.
pub trait TaskBackend: Send + Sync {
    /// Submit a prompt for a new run. Returns as soon as the run is accepted.
    fn submit(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<SubmitResponse, TaskError>> + Send;

    /// Query the current state of a run.
    fn status(
        &self,
        handle: &TaskHandle,
    ) -> impl std::future::Future<Output = Result<TaskStatusResponse, TaskError>> + Send;
}
