//! Conversation commands: `new` and `send`.
//!
//! While a reply resolves, a follower task renders the orchestrator's
//! session events under a spinner. Ctrl+C closes the conversation, which
//! abandons a running agent task; the submission then returns without a
//! reply turn.

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use console::style;
use indicatif::ProgressBar;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use spaces_core::conversation::SubmitOutcome;
use spaces_core::event::EventBus;
use spaces_types::error::SubmitError;
use spaces_types::event::{ReplyRoute, SessionEvent};

use super::Output;
use super::render::{print_turn, spinner, truncate};
use crate::state::AppState;

/// Start a space from `prompt` and resolve the first reply.
///
/// # Examples
///
/// ```bash
/// spaces new "Plan a weekend in Kyoto"
/// spaces new "Find the cheapest flight to Lisbon" --task
/// ```
pub async fn start(state: &AppState, prompt: &str, route: ReplyRoute, output: Output) -> Result<()> {
    let orchestrator = Arc::clone(&state.orchestrator);
    let ctx = state.caller.clone();
    let prompt = prompt.to_string();

    let (space, outcome) = drive(state, None, route, output, async move {
        orchestrator.start_conversation(&ctx, &prompt, route).await
    })
    .await?;

    if output.json {
        let body = serde_json::json!({ "space": space, "outcome": outcome });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if output.styled() {
        println!();
        println!(
            "  {} Space '{}' created",
            style("✓").green().bold(),
            style(&space.title).cyan()
        );
        println!("  {}  {}", style("ID:").bold(), style(space.id).dim());
        println!();
    }
    print_outcome(&outcome, output);
    Ok(())
}

/// Submit `text` to an existing space and resolve its reply.
pub async fn send(
    state: &AppState,
    id: &Uuid,
    text: &str,
    route: ReplyRoute,
    output: Output,
) -> Result<()> {
    let orchestrator = Arc::clone(&state.orchestrator);
    let ctx = state.caller.clone();
    let (space_id, text) = (*id, text.to_string());

    let outcome = drive(state, Some(*id), route, output, async move {
        orchestrator.submit(&ctx, &space_id, &text, route).await
    })
    .await?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    if output.styled() {
        println!();
    }
    print_outcome(&outcome, output);
    Ok(())
}

/// Run a submission with a live follower, closing the conversation on Ctrl+C.
async fn drive<T>(
    state: &AppState,
    known_space: Option<Uuid>,
    route: ReplyRoute,
    output: Output,
    submission: impl Future<Output = Result<T, SubmitError>>,
) -> Result<T> {
    let initial = match route {
        ReplyRoute::Direct => "Thinking...",
        ReplyRoute::Task => "Starting task...",
    };
    let spinner = spinner(output.styled(), initial);
    let follower = Follower::spawn(state.orchestrator.events(), spinner.clone(), known_space);

    tokio::pin!(submission);
    let mut interrupted = false;
    let result = loop {
        tokio::select! {
            result = &mut submission => break result,
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Ctrl+C handler unavailable");
                    continue;
                }
                match follower.space_id() {
                    Some(id) => {
                        state.orchestrator.close(&state.caller, &id);
                        spinner.set_message("Abandoning...");
                    }
                    None => tracing::debug!("Interrupted before the space was known"),
                }
            }
        }
    };

    follower.stop();
    spinner.finish_and_clear();
    Ok(result?)
}

fn print_outcome(outcome: &SubmitOutcome, output: Output) {
    if !output.styled() {
        return;
    }
    match &outcome.reply {
        Some(turn) => print_turn(turn),
        None => {
            println!(
                "  {} Task abandoned; no reply was recorded.",
                style("!").yellow().bold()
            );
            println!();
        }
    }
}

/// Renders session events for the duration of one submission.
struct Follower {
    space_id: Arc<OnceLock<Uuid>>,
    handle: JoinHandle<()>,
}

impl Follower {
    fn spawn(events: &EventBus, spinner: ProgressBar, known_space: Option<Uuid>) -> Self {
        let space_id = Arc::new(OnceLock::new());
        if let Some(id) = known_space {
            let _ = space_id.set(id);
        }

        let mut rx = events.subscribe();
        let seen = Arc::clone(&space_id);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(id) = event_space(&event) {
                            let _ = seen.set(id);
                        }
                        render_event(&spinner, &event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Follower lagged behind session events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { space_id, handle }
    }

    fn space_id(&self) -> Option<Uuid> {
        self.space_id.get().copied()
    }

    fn stop(self) {
        self.handle.abort();
    }
}

fn event_space(event: &SessionEvent) -> Option<Uuid> {
    match event {
        SessionEvent::TurnPending { space_id, .. }
        | SessionEvent::TurnRolledBack { space_id, .. }
        | SessionEvent::TaskStarted { space_id, .. }
        | SessionEvent::ThoughtsReceived { space_id, .. }
        | SessionEvent::SnapshotUpdated { space_id, .. }
        | SessionEvent::TaskFinished { space_id, .. }
        | SessionEvent::ReplyFailed { space_id, .. } => Some(*space_id),
        SessionEvent::TurnCommitted { turn, .. } => Some(turn.space_id),
    }
}

fn render_event(spinner: &ProgressBar, event: &SessionEvent) {
    match event {
        SessionEvent::TurnPending { .. } => spinner.set_message("Sending..."),
        SessionEvent::TurnCommitted {
            local_id: Some(_), ..
        } => spinner.set_message("Waiting for a reply..."),
        SessionEvent::TurnCommitted { local_id: None, .. } => {}
        SessionEvent::TurnRolledBack { error, .. } => {
            spinner.println(format!(
                "  {} Message not sent: {error}",
                style("✗").red().bold()
            ));
        }
        SessionEvent::TaskStarted { task_id, .. } => {
            spinner.set_message(format!("Task {task_id} running..."));
        }
        SessionEvent::ThoughtsReceived { thoughts, .. } => {
            for thought in thoughts {
                spinner.println(format!(
                    "  {} {}",
                    style("›").dim(),
                    style(truncate(&thought.display_text, 120)).dim()
                ));
            }
            if let Some(last) = thoughts.last() {
                spinner.set_message(truncate(&last.display_text, 60));
            }
        }
        SessionEvent::SnapshotUpdated { bytes_base64, .. } => {
            tracing::debug!(bytes_base64, "Browser snapshot updated");
        }
        SessionEvent::TaskFinished { state, .. } => {
            spinner.set_message(format!("Task {state}"));
        }
        SessionEvent::ReplyFailed { error, .. } => {
            spinner.println(format!(
                "  {} Reply failed: {error}",
                style("!").yellow().bold()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spaces_types::space::{Turn, TurnRole};
    use spaces_types::task::TaskHandle;

    #[test]
    fn every_event_names_its_space() {
        let id = Uuid::now_v7();
        let events = [
            SessionEvent::TurnPending {
                space_id: id,
                local_id: 1,
                role: TurnRole::User,
                content: "hi".to_string(),
            },
            SessionEvent::TurnCommitted {
                local_id: None,
                turn: Turn::new(id, TurnRole::Assistant, "hello"),
            },
            SessionEvent::TaskStarted {
                space_id: id,
                task_id: TaskHandle::new("t1").unwrap(),
            },
        ];
        for event in &events {
            assert_eq!(event_space(event), Some(id));
        }
    }

    #[tokio::test]
    async fn follower_learns_space_from_events() {
        let bus = EventBus::default();
        let follower = Follower::spawn(&bus, ProgressBar::hidden(), None);
        assert_eq!(follower.space_id(), None);

        let id = Uuid::now_v7();
        bus.publish(SessionEvent::TurnPending {
            space_id: id,
            local_id: 1,
            role: TurnRole::User,
            content: "hi".to_string(),
        });

        for _ in 0..100 {
            if follower.space_id().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(follower.space_id(), Some(id));
        follower.stop();
    }
}
