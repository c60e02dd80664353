//! Shared terminal rendering helpers.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use spaces_types::space::{Turn, TurnRole};

/// A steady-ticking spinner, or a hidden one when output is not styled.
pub fn spinner(visible: bool, message: &str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Print one turn with a role label.
pub fn print_turn(turn: &Turn) {
    let label = match turn.role {
        TurnRole::User => style("You").cyan().bold(),
        TurnRole::Assistant => style("Assistant").green().bold(),
        TurnRole::System => style("System").yellow().bold(),
    };
    println!(
        "  {} {}",
        label,
        style(turn.created_at.format("%Y-%m-%d %H:%M")).dim()
    );
    for line in turn.content.lines() {
        println!("    {line}");
    }
    println!();
}

/// Truncate to `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let keep = max.saturating_sub(3);
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str("...");
    out
}

pub fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
