//! CLI command definitions for the `spaces` binary.
//!
//! Uses clap derive macros. Commands are thin: every behavior lives in
//! spaces-core, these modules only parse, dispatch, and render.

pub mod conversation;
pub mod render;
pub mod space;

use clap::{Parser, Subcommand};
use spaces_types::event::ReplyRoute;
use uuid::Uuid;

use crate::state::AppState;

/// Chat with an assistant, directly or through a long-running agent task.
#[derive(Parser)]
#[command(name = "spaces", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new space from a prompt.
    New {
        /// The first message; its first 100 characters become the title.
        prompt: String,

        /// Answer with the agent task backend instead of the model.
        #[arg(long)]
        task: bool,
    },

    /// Send a message to an existing space.
    Send {
        /// Space ID.
        id: Uuid,

        /// Message text.
        text: String,

        /// Answer with the agent task backend instead of the model.
        #[arg(long)]
        task: bool,
    },

    /// List spaces (newest first).
    #[command(alias = "ls")]
    List {
        /// Only favorited spaces, most recently active first.
        #[arg(long, conflicts_with = "all")]
        saved: bool,

        /// Every space, most recently active first.
        #[arg(long)]
        all: bool,

        /// Maximum number of spaces to show.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print a space's transcript.
    Show {
        /// Space ID.
        id: Uuid,
    },

    /// Rename a space (at most 50 characters).
    Rename {
        /// Space ID.
        id: Uuid,

        /// New title.
        title: String,
    },

    /// Mark a space as a favorite.
    Save {
        /// Space ID.
        id: Uuid,
    },

    /// Remove a space from favorites.
    Unsave {
        /// Space ID.
        id: Uuid,
    },
}

/// Which listing `spaces list` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Recent,
    Saved,
    All,
}

/// Global rendering flags.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// Whether styled, human-oriented output should be printed.
    pub fn styled(self) -> bool {
        !self.json && !self.quiet
    }
}

/// `--task` forces the task path; otherwise the configured default applies.
pub fn route(state: &AppState, task: bool) -> ReplyRoute {
    if task {
        ReplyRoute::Task
    } else {
        state.config.reply_route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_parses_id_and_flags() {
        let id = Uuid::now_v7();
        let id_arg = id.to_string();
        let cli = Cli::try_parse_from([
            "spaces",
            "send",
            id_arg.as_str(),
            "hello there",
            "--task",
            "--json",
            "-vv",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Send { id: parsed, text, task } => {
                assert_eq!(parsed, id);
                assert_eq!(text, "hello there");
                assert!(task);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn list_scopes_conflict() {
        assert!(Cli::try_parse_from(["spaces", "list", "--saved", "--all"]).is_err());
        assert!(Cli::try_parse_from(["spaces", "ls", "--limit", "3"]).is_ok());
    }

    #[test]
    fn invalid_space_id_is_rejected() {
        assert!(Cli::try_parse_from(["spaces", "show", "not-a-uuid"]).is_err());
    }
}
