//! Task poller: the polling state machine for a single agent run.
//!
//! `Idle -> Polling -> {Succeeded, Failed, Abandoned}`.
//!
//! The backend returns the full thought history on every status call, so the
//! poller keeps a running count of thoughts already surfaced and emits only
//! the suffix beyond it. Each poller instance owns exactly one polling
//! session: it delivers exactly one terminal outcome, and its cadence timer
//! is dropped the moment that outcome is decided. Cancellation is observed
//! both between ticks and while a status request is in flight; a response
//! that arrives after cancellation is discarded.

use std::time::Duration;

use spaces_types::config::TaskConfig;
use spaces_types::error::TaskError;
use spaces_types::task::{
    FailureKind, PollOutcome, PollerState, Snapshot, TaskHandle, TaskState, TaskStatusResponse,
};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::TaskBackend;

/// Cadence and deadline for a polling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Overall limit on a polling session; `None` polls until a terminal state.
    pub deadline: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from(&TaskConfig::default())
    }
}

impl From<&TaskConfig> for PollerConfig {
    fn from(config: &TaskConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            deadline: (config.max_duration_secs > 0)
                .then(|| Duration::from_secs(config.max_duration_secs)),
        }
    }
}

/// Non-terminal progress surfaced while polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollUpdate {
    /// Thoughts not seen in any earlier response, in backend order.
    Thoughts(Vec<String>),
    /// The latest snapshot carried by a response.
    Snapshot(Snapshot),
}

/// Errors from misusing a poller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollerError {
    #[error("poller already started (state: {0})")]
    AlreadyStarted(PollerState),
}

/// What a single status response means for the session.
#[derive(Debug, Default)]
struct Observation {
    new_thoughts: Vec<String>,
    snapshot: Option<Snapshot>,
    outcome: Option<PollOutcome>,
}

/// Polls one agent run until it succeeds, fails, or is abandoned.
#[derive(Debug)]
pub struct TaskPoller {
    config: PollerConfig,
    cancel: CancellationToken,
    state: PollerState,
    handle: Option<TaskHandle>,
    /// Number of thoughts already surfaced.
    seen: usize,
    /// Number of status queries issued.
    ticks: u64,
}

impl TaskPoller {
    /// Create an idle poller. Cancelling `cancel` abandons the session.
    pub fn new(config: PollerConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            state: PollerState::Idle,
            handle: None,
            seen: 0,
            ticks: 0,
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn handle(&self) -> Option<&TaskHandle> {
        self.handle.as_ref()
    }

    /// Number of thoughts surfaced so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Number of status queries issued so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run the polling session for `handle` to its terminal outcome.
    ///
    /// `on_update` receives thought deltas and snapshots as they arrive. The
    /// first query is issued one interval after the call.
    #[tracing::instrument(name = "task_poll", skip_all, fields(task_id = %handle))]
    pub async fn run<B: TaskBackend>(
        &mut self,
        backend: &B,
        handle: TaskHandle,
        mut on_update: impl FnMut(PollUpdate),
    ) -> Result<PollOutcome, PollerError> {
        if self.state != PollerState::Idle {
            return Err(PollerError::AlreadyStarted(self.state));
        }
        self.state = PollerState::Polling;
        self.handle = Some(handle.clone());
        info!(interval_ms = self.config.interval.as_millis() as u64, "Polling started");

        let started = Instant::now();
        let mut ticker = time::interval_at(started + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollOutcome::Abandoned,
                _ = ticker.tick() => {}
            }

            if let Some(deadline) = self.config.deadline {
                if started.elapsed() >= deadline {
                    break PollOutcome::Failed {
                        kind: FailureKind::Deadline,
                        message: format!("task did not finish within {}s", deadline.as_secs()),
                    };
                }
            }

            self.ticks += 1;
            let response = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break PollOutcome::Abandoned,
                response = backend.status(&handle) => response,
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, tick = self.ticks, "Status query failed");
                    break match e {
                        TaskError::Upstream(message) => PollOutcome::Failed {
                            kind: FailureKind::Upstream,
                            message,
                        },
                        TaskError::Transport(message) => PollOutcome::Failed {
                            kind: FailureKind::Transport,
                            message,
                        },
                    };
                }
            };

            let observation = self.observe(response);
            if self.cancel.is_cancelled() {
                break PollOutcome::Abandoned;
            }

            if !observation.new_thoughts.is_empty() {
                debug!(new = observation.new_thoughts.len(), total = self.seen, "New thoughts");
                on_update(PollUpdate::Thoughts(observation.new_thoughts));
            }
            if let Some(snapshot) = observation.snapshot {
                on_update(PollUpdate::Snapshot(snapshot));
            }
            if let Some(outcome) = observation.outcome {
                break outcome;
            }
        };

        drop(ticker);
        self.state = outcome.state();
        info!(state = %self.state, ticks = self.ticks, thoughts = self.seen, "Polling finished");
        Ok(outcome)
    }

    /// Fold one status response into the session.
    fn observe(&mut self, response: TaskStatusResponse) -> Observation {
        let thoughts = response.thoughts.unwrap_or_default();

        let new_thoughts = if thoughts.len() > self.seen {
            let delta = thoughts[self.seen..].to_vec();
            self.seen = thoughts.len();
            delta
        } else {
            if thoughts.len() < self.seen && !thoughts.is_empty() {
                warn!(
                    seen = self.seen,
                    reported = thoughts.len(),
                    "Backend reported fewer thoughts than already surfaced"
                );
            }
            Vec::new()
        };

        let snapshot = response
            .browser_screenshot
            .filter(|s| !s.trim().is_empty())
            .map(|jpeg_base64| Snapshot { jpeg_base64 });

        let outcome = match response.status {
            TaskState::Success => response
                .results
                .filter(|r| !r.is_empty())
                .map(|result| PollOutcome::Succeeded { result, thoughts }),
            TaskState::Error => Some(PollOutcome::Failed {
                kind: FailureKind::Upstream,
                message: response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
            TaskState::InProgress(_) => None,
        };

        Observation {
            new_thoughts,
            snapshot,
            outcome,
        }
    }
}
