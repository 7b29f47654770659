//! `chatrelay history`: inspect and clear stored sessions.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use chatrelay_types::chat::{Turn, TurnRole};

use crate::state::AppState;

/// Print the most recent turns of a session, oldest first.
pub async fn show(state: &AppState, session_id: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let limit = limit.unwrap_or(state.config.history.max_turns);
    let turns = state.relay.history().load(session_id, limit).await;

    if json {
        let body = serde_json::json!({ "session_id": session_id, "turns": turns });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!(
            "  {} No history for session '{}'.",
            style("i").blue().bold(),
            style(session_id).cyan()
        );
        println!();
        return Ok(());
    }

    println!("{}", turn_table(&turns));
    Ok(())
}

fn turn_table(turns: &[Turn]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Content").fg(Color::White),
    ]);

    for (i, turn) in turns.iter().enumerate() {
        let role_color = match turn.role {
            TurnRole::User => Color::Cyan,
            TurnRole::Assistant => Color::Green,
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(turn.role.label()).fg(role_color),
            Cell::new(&turn.content),
        ]);
    }
    table
}

/// Delete a session, asking first unless `yes` or `json`.
pub async fn clear(state: &AppState, session_id: &str, yes: bool, json: bool) -> Result<()> {
    if !yes && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete all history for session '{}'?",
                style(session_id).red().bold()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let cleared = state.relay.history().clear(session_id).await;

    if json {
        let body = serde_json::json!({ "session_id": session_id, "cleared": cleared });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if !cleared {
        bail!("History store unavailable; session '{session_id}' was not cleared");
    }

    println!(
        "  {} Cleared session '{}'",
        style("✓").green().bold(),
        style(session_id).cyan()
    );
    Ok(())
}
