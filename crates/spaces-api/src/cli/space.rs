//! Space management commands: list, show, rename, save/unsave.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use spaces_types::space::{Space, SpaceSummary};

use super::render::{format_relative_time, print_turn, truncate};
use super::{ListScope, Output};
use crate::state::AppState;

/// List spaces in a table.
///
/// # Examples
///
/// ```bash
/// spaces list
/// spaces list --saved
/// spaces list --all --limit 20 --json
/// ```
pub async fn list(
    state: &AppState,
    scope: ListScope,
    limit: Option<i64>,
    output: Output,
) -> Result<()> {
    let store = state.orchestrator.store();
    let ctx = &state.caller;

    let summaries: Vec<SpaceSummary> = match scope {
        ListScope::Recent => store
            .recent(ctx, limit)
            .await?
            .into_iter()
            .map(|space| SpaceSummary {
                space,
                last_turn: None,
            })
            .collect(),
        ListScope::Saved => {
            let mut saved = store.favorites(ctx).await?;
            if let Some(limit) = limit {
                saved.truncate(usize::try_from(limit).unwrap_or(0));
            }
            saved
        }
        ListScope::All => store.all(ctx, limit).await?,
    };

    if output.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    if summaries.is_empty() {
        println!();
        println!(
            "  {} No spaces found. Start one with: {}",
            style("i").blue().bold(),
            style("spaces new \"<prompt>\"").yellow()
        );
        println!();
        return Ok(());
    }

    let with_preview = scope != ListScope::Recent;

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Saved").fg(Color::White),
    ];
    if with_preview {
        header.push(Cell::new("Last Active").fg(Color::White));
        header.push(Cell::new("Last Message").fg(Color::White));
    } else {
        header.push(Cell::new("Created").fg(Color::White));
    }
    table.set_header(header);

    for summary in &summaries {
        let space = &summary.space;
        let saved = if space.saved {
            Cell::new("★").fg(Color::Yellow)
        } else {
            Cell::new("")
        };
        let mut row = vec![
            Cell::new(space.id.to_string()).fg(Color::DarkGrey),
            Cell::new(truncate(&space.title, 40)).fg(Color::Cyan),
            saved,
        ];
        if with_preview {
            row.push(Cell::new(format_relative_time(&space.updated_at)));
            let preview = summary
                .last_turn
                .as_ref()
                .map(|t| truncate(&t.content, 50))
                .unwrap_or_else(|| "(no messages)".to_string());
            row.push(Cell::new(preview));
        } else {
            row.push(Cell::new(format_relative_time(&space.created_at)));
        }
        table.add_row(row);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} space{}",
        summaries.len(),
        if summaries.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print a space's transcript, greeting it first if it has no turns yet.
pub async fn show(state: &AppState, id: &Uuid, output: Output) -> Result<()> {
    state.orchestrator.greet(&state.caller, id).await?;
    let detail = state
        .orchestrator
        .store()
        .get_with_turns(&state.caller, id)
        .await?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }
    if output.quiet {
        return Ok(());
    }

    print_header(&detail.space);
    for turn in &detail.turns {
        print_turn(turn);
    }
    Ok(())
}

pub async fn rename(state: &AppState, id: &Uuid, title: &str, output: Output) -> Result<()> {
    let space = state
        .orchestrator
        .store()
        .rename(&state.caller, id, title)
        .await?;
    print_updated(&space, "Renamed", output)
}

pub async fn set_saved(state: &AppState, id: &Uuid, saved: bool, output: Output) -> Result<()> {
    let space = state
        .orchestrator
        .store()
        .set_favorite(&state.caller, id, saved)
        .await?;
    let verb = if saved { "Saved" } else { "Unsaved" };
    print_updated(&space, verb, output)
}

fn print_header(space: &Space) {
    println!();
    println!(
        "  {} {}",
        style(&space.title).cyan().bold(),
        if space.saved {
            style("★").yellow().to_string()
        } else {
            String::new()
        }
    );
    println!(
        "  {}  {}",
        style("ID:").bold(),
        style(space.id.to_string()).dim()
    );
    println!(
        "  {}  {}",
        style("Created:").bold(),
        space.created_at.format("%Y-%m-%d %H:%M")
    );
    println!();
}

fn print_updated(space: &Space, verb: &str, output: Output) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(space)?);
    } else if output.styled() {
        println!();
        println!(
            "  {} {} '{}'",
            style("✓").green().bold(),
            verb,
            style(&space.title).cyan()
        );
        println!();
    }
    Ok(())
}
