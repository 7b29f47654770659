//! `chatrelay ask`: one relay round trip from the terminal.

use std::io::Write;

use anyhow::{Context, Result, bail};
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use chatrelay_types::chat::{ChatRequest, RelayEvent};

use crate::state::AppState;

/// Send `request` and print the reply.
///
/// With `stream`, fragments are printed as they arrive; `--json` then
/// prints one [`RelayEvent`] per line instead.
///
/// # Examples
///
/// ```bash
/// chatrelay ask "What is a mutual fund?" --session alice
/// chatrelay ask "And an ETF?" --session alice --stream
/// ```
pub async fn ask(state: &AppState, request: ChatRequest, stream: bool, json: bool) -> Result<()> {
    request.validate().context("Invalid request")?;

    if stream {
        ask_streaming(state, request, json).await
    } else {
        ask_blocking(state, request, json).await
    }
}

async fn ask_blocking(state: &AppState, request: ChatRequest, json: bool) -> Result<()> {
    let spinner = (!json).then(|| {
        let spinner = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(template);
        }
        spinner.set_message(format!("Asking {}...", state.relay.resolve_model(&request)));
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner
    });

    let result = state.relay.chat(&request).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let reply = result.context("Chat failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    println!("{}", reply.reply);
    println!();
    println!(
        "  {} {} {}",
        style("session").dim(),
        style(&reply.session_id).cyan(),
        style(format!("({})", reply.model)).dim()
    );
    Ok(())
}

async fn ask_streaming(state: &AppState, request: ChatRequest, json: bool) -> Result<()> {
    let mut events = state.relay.chat_stream(request);
    let mut stdout = std::io::stdout();

    while let Some(event) = events.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
            if let RelayEvent::Error(message) = event {
                bail!("Stream failed: {message}");
            }
            continue;
        }

        match event {
            RelayEvent::Fragment(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            RelayEvent::Done => {
                writeln!(stdout)?;
            }
            RelayEvent::Error(message) => {
                writeln!(stdout)?;
                bail!("Stream failed: {message}");
            }
        }
    }
    Ok(())
}
