//! Spaces CLI entry point.
//!
//! Binary name: `spaces`
//!
//! Parses CLI arguments, initializes tracing, the database, and the
//! orchestrator, then dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use spaces_observe::tracing_setup::{default_directives, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, ListScope};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(default_directives(cli.verbose, cli.quiet), cli.otel)?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    let output = cli::Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::New { prompt, task } => {
            let route = cli::route(&state, task);
            cli::conversation::start(&state, &prompt, route, output).await?;
        }

        Commands::Send { id, text, task } => {
            let route = cli::route(&state, task);
            cli::conversation::send(&state, &id, &text, route, output).await?;
        }

        Commands::List { saved, all, limit } => {
            let scope = if saved {
                ListScope::Saved
            } else if all {
                ListScope::All
            } else {
                ListScope::Recent
            };
            cli::space::list(&state, scope, limit, output).await?;
        }

        Commands::Show { id } => {
            cli::space::show(&state, &id, output).await?;
        }

        Commands::Rename { id, title } => {
            cli::space::rename(&state, &id, &title, output).await?;
        }

        Commands::Save { id } => {
            cli::space::set_saved(&state, &id, true, output).await?;
        }

        Commands::Unsave { id } => {
            cli::space::set_saved(&state, &id, false, output).await?;
        }
    }

    Ok(())
}
