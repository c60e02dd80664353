//! In-crate fakes for the core ports.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use spaces_types::error::{RepositoryError, TaskError};
use spaces_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};
use spaces_types::space::{Space, Turn};
use spaces_types::task::{SubmitResponse, TaskHandle, TaskStatusResponse};
use uuid::Uuid;

use crate::llm::provider::LlmProvider;
use crate::space::repository::{SpaceFilter, SpaceOrder, SpaceRepository};
use crate::task::backend::TaskBackend;

// --- Repository ---

#[derive(Default)]
struct MemoryState {
    spaces: HashMap<Uuid, Space>,
    turns: Vec<Turn>,
}

/// In-memory `SpaceRepository`. Clones share state.
#[derive(Clone, Default)]
pub struct MemorySpaceRepository {
    state: Arc<Mutex<MemoryState>>,
    fail_appends: Arc<AtomicBool>,
}

impl MemorySpaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append_turn` fail with a query error.
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn space_count(&self) -> usize {
        self.state.lock().unwrap().spaces.len()
    }

    pub fn turn_count(&self, space_id: &Uuid) -> usize {
        self.state
            .lock()
            .unwrap()
            .turns
            .iter()
            .filter(|t| t.space_id == *space_id)
            .count()
    }
}

impl SpaceRepository for MemorySpaceRepository {
    async fn create_space(&self, space: &Space) -> Result<Space, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.spaces.contains_key(&space.id) {
            return Err(RepositoryError::Conflict(space.id.to_string()));
        }
        state.spaces.insert(space.id, space.clone());
        Ok(space.clone())
    }

    async fn get_space(&self, space_id: &Uuid) -> Result<Option<Space>, RepositoryError> {
        Ok(self.state.lock().unwrap().spaces.get(space_id).cloned())
    }

    async fn update_space(&self, space: &Space) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        match state.spaces.get_mut(&space.id) {
            Some(existing) => {
                *existing = space.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_spaces(
        &self,
        owner_id: &str,
        filter: &SpaceFilter,
    ) -> Result<Vec<Space>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut spaces: Vec<Space> = state
            .spaces
            .values()
            .filter(|s| s.owner_id == owner_id && (!filter.saved_only || s.saved))
            .cloned()
            .collect();
        match filter.order {
            SpaceOrder::CreatedDesc => {
                spaces.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
            }
            SpaceOrder::UpdatedDesc => {
                spaces.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)))
            }
        }
        if let Some(limit) = filter.limit {
            spaces.truncate(limit.max(0) as usize);
        }
        Ok(spaces)
    }

    async fn append_turn(&self, turn: &Turn) -> Result<(), RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk I/O error".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state
            .spaces
            .get_mut(&turn.space_id)
            .ok_or(RepositoryError::NotFound)?
            .updated_at = Utc::now();
        state.turns.push(turn.clone());
        Ok(())
    }

    async fn list_turns(&self, space_id: &Uuid) -> Result<Vec<Turn>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut turns: Vec<Turn> = state
            .turns
            .iter()
            .filter(|t| t.space_id == *space_id)
            .cloned()
            .collect();
        turns.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(turns)
    }

    async fn last_turn(&self, space_id: &Uuid) -> Result<Option<Turn>, RepositoryError> {
        Ok(self.list_turns(space_id).await?.pop())
    }

    async fn count_turns(&self, space_id: &Uuid) -> Result<u32, RepositoryError> {
        Ok(self.turn_count(space_id) as u32)
    }
}

// --- Completion model ---

/// Scripted `LlmProvider` that answers every request the same way.
pub struct ScriptedLlm {
    /// `None` fails every request.
    reply: Option<String>,
    latency: Duration,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedLlm {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            latency: Duration::ZERO,
            requests: Arc::default(),
        }
    }

    /// Every request fails with `LlmError::Overloaded`.
    pub fn failing() -> Self {
        Self {
            reply: None,
            latency: Duration::ZERO,
            requests: Arc::default(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shared log of received requests.
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.reply {
            Some(text) => Ok(CompletionResponse {
                id: "msg_scripted".to_string(),
                content: text.clone(),
                model: request.model.clone(),
                stop_reason: StopReason::EndTurn,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            }),
            None => Err(LlmError::Overloaded("scripted overload".to_string())),
        }
    }
}

// --- Task backend ---

#[derive(Default)]
struct BackendScript {
    submission: Option<Result<SubmitResponse, TaskError>>,
    statuses: VecDeque<Result<TaskStatusResponse, TaskError>>,
    repeat: Option<TaskStatusResponse>,
    submitted: Vec<String>,
    polled: Vec<String>,
}

/// Scripted `TaskBackend`. Clones share the script and counters.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<BackendScript>>,
    status_calls: Arc<AtomicUsize>,
    latency: Duration,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept submissions with the given message.
    pub fn accept(self, message: &str) -> Self {
        self.script.lock().unwrap().submission = Some(Ok(SubmitResponse {
            status: "success".to_string(),
            message: message.to_string(),
            task_id: None,
        }));
        self
    }

    /// Reject submissions with `status: error` and the given message.
    pub fn reject(self, message: &str) -> Self {
        self.script.lock().unwrap().submission = Some(Ok(SubmitResponse {
            status: "error".to_string(),
            message: message.to_string(),
            task_id: None,
        }));
        self
    }

    pub fn submit_error(self, error: TaskError) -> Self {
        self.script.lock().unwrap().submission = Some(Err(error));
        self
    }

    /// Queue one status response.
    pub fn respond(self, response: TaskStatusResponse) -> Self {
        self.script.lock().unwrap().statuses.push_back(Ok(response));
        self
    }

    /// Queue one failed status query.
    pub fn status_error(self, error: TaskError) -> Self {
        self.script.lock().unwrap().statuses.push_back(Err(error));
        self
    }

    /// Response returned once the queue is exhausted.
    pub fn repeat(self, response: TaskStatusResponse) -> Self {
        self.script.lock().unwrap().repeat = Some(response);
        self
    }

    /// Delay applied to every status query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.script.lock().unwrap().submitted.clone()
    }

    pub fn polled_handles(&self) -> Vec<String> {
        self.script.lock().unwrap().polled.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl TaskBackend for ScriptedBackend {
    async fn submit(&self, prompt: &str) -> Result<SubmitResponse, TaskError> {
        let mut script = self.script.lock().unwrap();
        script.submitted.push(prompt.to_string());
        script
            .submission
            .clone()
            .unwrap_or_else(|| Err(TaskError::Transport("no submission scripted".to_string())))
    }

    async fn status(&self, handle: &TaskHandle) -> Result<TaskStatusResponse, TaskError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut script = self.script.lock().unwrap();
        script.polled.push(handle.as_str().to_string());
        match script.statuses.pop_front() {
            Some(next) => next,
            None => Ok(script
                .repeat
                .clone()
                .unwrap_or_else(|| TaskStatusResponse::in_progress(Vec::new()))),
        }
    }
}
