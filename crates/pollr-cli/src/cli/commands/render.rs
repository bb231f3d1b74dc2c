//! Plain-text rendering of screen state.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use pollr_core::model::Poll;
use pollr_core::screens::poll_detail::{ReadyPoll, VotePhase};
use pollr_core::screens::{Alert, AlertKind};
use pollr_core::validation::ValidationErrors;

pub fn format_created(created_at: Option<DateTime<Utc>>) -> String {
    created_at.map_or_else(
        || "unknown".to_string(),
        |ts| ts.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Numbered poll list; numbers are what `open <n>` takes.
pub fn poll_table(polls: &[Poll]) -> String {
    let mut table = table();
    table.set_header(vec!["#", "ID", "Question", "Options", "Created"]);
    for (index, poll) in polls.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            poll.id.to_string(),
            poll.question.clone(),
            poll.options.len().to_string(),
            format_created(poll.created_at),
        ]);
    }
    table.to_string()
}

/// Options with counts. Percentages appear only after voting.
pub fn poll_detail(ready: &ReadyPoll) -> String {
    let voted = ready.has_voted();
    let marked = ready.selected();

    let mut table = table();
    if voted {
        table.set_header(vec!["#", "", "Option", "Votes", "%"]);
    } else {
        table.set_header(vec!["#", "", "Option"]);
    }

    for (index, (option, count, pct)) in ready.tally.rows().enumerate() {
        let mark = if Some(option) == marked { "●" } else { "○" };
        let mut row = vec![(index + 1).to_string(), mark.to_string(), option.to_string()];
        if voted {
            row.push(count.to_string());
            row.push(format!("{pct}%"));
        }
        table.add_row(row);
    }

    let status = match &ready.phase {
        VotePhase::Voted { choice } => format!(
            "You voted for \"{choice}\". Total votes: {}",
            ready.tally.total()
        ),
        VotePhase::NotVoted { .. } => "You have not voted yet.".to_string(),
    };

    format!("{}\n\n{table}\n{status}", ready.poll.question)
}

pub fn alert(alert: &Alert) -> String {
    match alert.kind {
        AlertKind::Error => format!("✗ {alert}"),
        AlertKind::Info => format!("• {alert}"),
    }
}

pub fn validation_errors(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("  {field}: {message}"))
        .collect::<Vec<_>>()
        .join("\n")
}
