//! Conversation orchestrator.
//!
//! Every submission follows the same shape: the user turn is shown
//! optimistically, made durable, and only then routed through exactly one
//! reply path (direct completion or agent task). Whatever that path yields,
//! success or failure, becomes exactly one more durable turn. The one
//! exception is an abandoned task, which appends nothing.
//!
//! Submissions on the same conversation are serialized by an in-flight flag;
//! a second submission while one is outstanding is rejected with
//! [`SubmitError::Busy`]. The flag is owned by the orchestrator, not by the
//! live session, so it survives a close and reopen while a reply is still
//! resolving.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use spaces_types::config::GlobalConfig;
use spaces_types::error::{LaunchError, SpaceError, SubmitError};
use spaces_types::event::{ReplyRoute, SessionEvent};
use spaces_types::space::{CallerContext, MAX_TURN_CHARS, Space, Turn, TurnRole};
use spaces_types::task::{FailureKind, PollOutcome, PollerState, TaskHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::view::TranscriptView;
use crate::event::EventBus;
use crate::reply::DirectReplyInvoker;
use crate::space::repository::SpaceRepository;
use crate::space::service::{TranscriptStore, validate_content};
use crate::task::backend::TaskBackend;
use crate::task::launcher::TaskLauncher;
use crate::task::poller::{PollUpdate, PollerConfig, TaskPoller};
use crate::thought::ThoughtClassifier;

/// Shown when a task could not be submitted because the backend was unreachable.
pub const CONNECT_FAILURE_TEXT: &str = "Failed to connect to the server.";
/// Shown when a status query failed mid-task.
pub const RETRIEVE_FAILURE_TEXT: &str = "Failed to retrieve results.";

/// Orchestrator behavior that comes from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub poller: PollerConfig,
    /// Assistant text recorded when the direct path fails.
    pub apology: String,
    pub greeting: String,
    pub agent_name: String,
    pub final_answer_markers: Vec<String>,
}

impl From<&GlobalConfig> for OrchestratorSettings {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            poller: PollerConfig::from(&config.task),
            apology: config.model.apology.clone(),
            greeting: config.greeting.clone(),
            agent_name: config.task.agent_name.clone(),
            final_answer_markers: config.task.final_answer_markers.clone(),
        }
    }
}

/// What a submission appended.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub space_id: Uuid,
    pub route: ReplyRoute,
    pub user_turn: Turn,
    /// `None` only when the task was abandoned.
    pub reply: Option<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_state: Option<PollerState>,
}

impl SubmitOutcome {
    pub fn turns_appended(&self) -> Vec<&Turn> {
        std::iter::once(&self.user_turn).chain(self.reply.as_ref()).collect()
    }
}

/// Live state of one open conversation.
pub struct ConversationSession {
    space_id: Uuid,
    owner_id: String,
    view: Mutex<TranscriptView>,
    /// Shared with every session ever opened for this conversation.
    in_flight: Arc<AtomicBool>,
    /// Cancelled when the conversation is closed.
    cancel: CancellationToken,
}

impl ConversationSession {
    fn new(space: &Space, turns: Vec<Turn>, in_flight: Arc<AtomicBool>) -> Self {
        Self {
            space_id: space.id,
            owner_id: space.owner_id.clone(),
            view: Mutex::new(TranscriptView::with_turns(space.id, turns)),
            in_flight,
            cancel: CancellationToken::new(),
        }
    }

    pub fn space_id(&self) -> Uuid {
        self.space_id
    }

    /// A copy of the current view.
    pub fn view(&self) -> TranscriptView {
        self.lock_view().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Claim the in-flight slot. `None` if a submission is already outstanding.
    pub(crate) fn begin(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(&self.in_flight)))
    }

    fn lock_view(&self) -> MutexGuard<'_, TranscriptView> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("space_id", &self.space_id)
            .field("busy", &self.is_busy())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Releases the in-flight slot on drop.
pub(crate) struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of the task path, before the reply is stored.
struct TaskRun {
    reply: Option<(TurnRole, String)>,
    task_id: Option<TaskHandle>,
    state: Option<PollerState>,
}

/// Coordinates the transcript store, both reply paths, and the live views.
///
/// Generic over the repository and task backend so spaces-core never
/// depends on spaces-infra.
pub struct Orchestrator<R: SpaceRepository, B: TaskBackend> {
    store: Arc<TranscriptStore<R>>,
    direct: DirectReplyInvoker,
    launcher: TaskLauncher<B>,
    classifier: ThoughtClassifier,
    settings: OrchestratorSettings,
    sessions: DashMap<Uuid, Arc<ConversationSession>>,
    /// Per-conversation in-flight flags. Never removed by `close`.
    in_flight: DashMap<Uuid, Arc<AtomicBool>>,
    events: EventBus,
}

impl<R: SpaceRepository, B: TaskBackend> Orchestrator<R, B> {
    pub fn new(
        store: Arc<TranscriptStore<R>>,
        direct: DirectReplyInvoker,
        launcher: TaskLauncher<B>,
        settings: OrchestratorSettings,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            direct,
            launcher,
            classifier: ThoughtClassifier::new(settings.agent_name.clone()),
            settings,
            sessions: DashMap::new(),
            in_flight: DashMap::new(),
            events,
        }
    }

    pub fn store(&self) -> &TranscriptStore<R> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// The open session for a conversation, if any.
    pub fn session(&self, space_id: &Uuid) -> Option<Arc<ConversationSession>> {
        self.sessions.get(space_id).map(|s| Arc::clone(s.value()))
    }

    /// Open (or reuse) the live session for a conversation the caller owns.
    pub async fn open(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
    ) -> Result<Arc<ConversationSession>, SpaceError> {
        if let Some(session) = self.session(space_id) {
            if session.owner_id != ctx.owner_id {
                return Err(SpaceError::NotFound);
            }
            return Ok(session);
        }

        let detail = self.store.get_with_turns(ctx, space_id).await?;
        let in_flight = Arc::clone(self.in_flight.entry(*space_id).or_default().value());
        let session = Arc::new(ConversationSession::new(
            &detail.space,
            detail.turns,
            in_flight,
        ));
        let session = Arc::clone(self.sessions.entry(*space_id).or_insert(session).value());
        debug!(space_id = %space_id, "Conversation opened");
        Ok(session)
    }

    /// Close a conversation: stop its polling immediately and drop its view.
    ///
    /// A direct reply already in flight still completes and keeps the
    /// conversation busy until it is stored. Returns `false` if the
    /// conversation was not open for this caller.
    pub fn close(&self, ctx: &CallerContext, space_id: &Uuid) -> bool {
        match self
            .sessions
            .remove_if(space_id, |_, session| session.owner_id == ctx.owner_id)
        {
            Some((_, session)) => {
                session.cancel.cancel();
                info!(space_id = %space_id, busy = session.is_busy(), "Conversation closed");
                true
            }
            None => false,
        }
    }

    /// Append the configured greeting if the conversation has no turns yet.
    pub async fn greet(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
    ) -> Result<Option<Turn>, SpaceError> {
        let session = self.open(ctx, space_id).await?;
        let turn = self
            .store
            .greet_if_empty(ctx, space_id, &self.settings.greeting)
            .await?;
        if let Some(turn) = &turn {
            session.lock_view().append_durable(turn.clone());
            self.events.publish(SessionEvent::TurnCommitted {
                local_id: None,
                turn: turn.clone(),
            });
        }
        Ok(turn)
    }

    /// Create a conversation from `prompt` and submit the prompt as its first turn.
    pub async fn start_conversation(
        &self,
        ctx: &CallerContext,
        prompt: &str,
        route: ReplyRoute,
    ) -> Result<(Space, SubmitOutcome), SubmitError> {
        let space = self.store.create_conversation(ctx, prompt).await?;
        let outcome = self.submit(ctx, &space.id, prompt, route).await?;
        Ok((space, outcome))
    }

    /// Submit a user turn and resolve its reply through `route`.
    ///
    /// Fails only when the user turn cannot be recorded or the reply turn
    /// cannot be written. Reply-path failures become synthesized turns.
    #[tracing::instrument(name = "submit", skip_all, fields(space_id = %space_id, route = ?route))]
    pub async fn submit(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
        text: &str,
        route: ReplyRoute,
    ) -> Result<SubmitOutcome, SubmitError> {
        validate_content(text)?;
        let session = self.open(ctx, space_id).await?;
        let Some(_in_flight) = session.begin() else {
            warn!("Submission rejected: a reply is already in progress");
            return Err(SubmitError::Busy);
        };

        let prefix = session.lock_view().durable_turns();
        let local_id = session.lock_view().push_pending(TurnRole::User, text);
        self.events.publish(SessionEvent::TurnPending {
            space_id: *space_id,
            local_id,
            role: TurnRole::User,
            content: text.to_string(),
        });

        let user_turn = match self
            .store
            .append_turn(ctx, space_id, TurnRole::User, text)
            .await
        {
            Ok(turn) => turn,
            Err(e) => {
                warn!(error = %e, "User turn not stored, rolling back");
                session.lock_view().rollback(local_id, e.to_string());
                self.events.publish(SessionEvent::TurnRolledBack {
                    space_id: *space_id,
                    local_id,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };
        session.lock_view().confirm(local_id, user_turn.clone());
        self.events.publish(SessionEvent::TurnCommitted {
            local_id: Some(local_id),
            turn: user_turn.clone(),
        });

        let run = match route {
            ReplyRoute::Direct => TaskRun {
                reply: Some(self.direct_reply(space_id, &prefix, text).await),
                task_id: None,
                state: None,
            },
            ReplyRoute::Task => self.task_reply(&session, text).await,
        };

        let reply = match run.reply {
            Some((role, content)) => {
                let turn = self
                    .store
                    .append_turn(ctx, space_id, role, &fit_turn(&content))
                    .await
                    .map_err(|e| {
                        error!(error = %e, role = %role, "Reply turn not stored");
                        SubmitError::Storage(e.to_string())
                    })?;
                session.lock_view().append_durable(turn.clone());
                self.events.publish(SessionEvent::TurnCommitted {
                    local_id: None,
                    turn: turn.clone(),
                });
                Some(turn)
            }
            None => None,
        };

        Ok(SubmitOutcome {
            space_id: *space_id,
            route,
            user_turn,
            reply,
            task_id: run.task_id,
            task_state: run.state,
        })
    }

    async fn direct_reply(&self, space_id: &Uuid, prefix: &[Turn], text: &str) -> (TurnRole, String) {
        match self.direct.reply(prefix, text).await {
            Ok(reply) => (TurnRole::Assistant, reply),
            Err(e) => {
                warn!(error = %e, "Direct reply failed, recording apology");
                self.events.publish(SessionEvent::ReplyFailed {
                    space_id: *space_id,
                    route: ReplyRoute::Direct,
                    error: e.to_string(),
                });
                (TurnRole::Assistant, self.settings.apology.clone())
            }
        }
    }

    async fn task_reply(&self, session: &ConversationSession, text: &str) -> TaskRun {
        let space_id = session.space_id;
        let handle = match self.launcher.launch(text).await {
            Ok(handle) => handle,
            Err(e) => {
                self.events.publish(SessionEvent::ReplyFailed {
                    space_id,
                    route: ReplyRoute::Task,
                    error: e.to_string(),
                });
                return TaskRun {
                    reply: Some((TurnRole::System, launch_failure_text(&e))),
                    task_id: None,
                    state: None,
                };
            }
        };
        self.events.publish(SessionEvent::TaskStarted {
            space_id,
            task_id: handle.clone(),
        });

        let mut poller = TaskPoller::new(self.settings.poller, session.cancel.child_token());
        let outcome = poller
            .run(self.launcher.backend(), handle.clone(), |update| {
                self.apply_update(session, update)
            })
            .await
            .unwrap_or_else(|e| PollOutcome::Failed {
                kind: FailureKind::Transport,
                message: e.to_string(),
            });

        session.lock_view().clear_ephemeral();
        let state = outcome.state();
        self.events.publish(SessionEvent::TaskFinished {
            space_id,
            task_id: handle.clone(),
            state,
        });

        let reply = match outcome {
            PollOutcome::Succeeded { result, thoughts } => Some((
                TurnRole::Assistant,
                self.classifier
                    .final_answer(&thoughts, &result, &self.settings.final_answer_markers),
            )),
            PollOutcome::Failed { kind, message } => {
                self.events.publish(SessionEvent::ReplyFailed {
                    space_id,
                    route: ReplyRoute::Task,
                    error: message.clone(),
                });
                Some((TurnRole::System, poll_failure_text(&kind, &message)))
            }
            PollOutcome::Abandoned => {
                info!(task_id = %handle, "Task abandoned, no reply recorded");
                None
            }
        };

        TaskRun {
            reply,
            task_id: Some(handle),
            state: Some(state),
        }
    }

    fn apply_update(&self, session: &ConversationSession, update: PollUpdate) {
        match update {
            PollUpdate::Thoughts(raw) => {
                let classified = self.classifier.classify_all(&raw);
                session.lock_view().record_thoughts(&classified);
                let significant: Vec<_> = classified
                    .into_iter()
                    .filter(|t| t.is_significant())
                    .collect();
                if !significant.is_empty() {
                    self.events.publish(SessionEvent::ThoughtsReceived {
                        space_id: session.space_id,
                        thoughts: significant,
                    });
                }
            }
            PollUpdate::Snapshot(snapshot) => {
                let bytes_base64 = snapshot.jpeg_base64.len();
                session.lock_view().set_snapshot(snapshot);
                self.events.publish(SessionEvent::SnapshotUpdated {
                    space_id: session.space_id,
                    bytes_base64,
                });
            }
        }
    }
}

fn launch_failure_text(error: &LaunchError) -> String {
    match error {
        LaunchError::Rejected(message) if message.trim().is_empty() => {
            "Error: Unknown error".to_string()
        }
        LaunchError::Rejected(message) => format!("Error: {message}"),
        LaunchError::Unreachable(_) => CONNECT_FAILURE_TEXT.to_string(),
        LaunchError::MalformedHandle(_) => format!("Error: {error}"),
    }
}

fn poll_failure_text(kind: &FailureKind, message: &str) -> String {
    match kind {
        FailureKind::Transport => RETRIEVE_FAILURE_TEXT.to_string(),
        FailureKind::Upstream | FailureKind::Deadline => format!("Error: {message}"),
    }
}

/// Clamp reply content to the turn size limit.
fn fit_turn(content: &str) -> String {
    if content.chars().count() <= MAX_TURN_CHARS {
        content.to_string()
    } else {
        content.chars().take(MAX_TURN_CHARS).collect()
    }
}
