//! chatrelay CLI and HTTP relay entry point.
//!
//! Binary name: `chatrelay`
//!
//! Loads `.env` and configuration, initializes tracing and the relay, then
//! dispatches to the command handler or starts the HTTP server.

mod cli;
mod http;
mod state;

use anyhow::Result;
use clap::Parser;
use clap_complete::generate;

use chatrelay_infra::config::{apply_env_overrides, load_relay_config, resolve_data_dir};
use chatrelay_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use chatrelay_types::chat::ChatRequest;

use cli::{Cli, Commands, HistoryAction};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Shell completions don't need config or state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "chatrelay", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir.join("config.toml"));
    let loaded = load_relay_config(&config_path).await;
    let config = apply_env_overrides(loaded.config.clone(), |key| std::env::var(key).ok());

    let (serving, otel, log_json) = match &cli.command {
        Commands::Serve { otel, log_json, .. } => (true, *otel, *log_json),
        _ => (false, false, false),
    };
    let mut options = TracingOptions::new(cli::log_filter(cli.verbose, cli.quiet, config.debug, serving));
    options.json = log_json;
    options.otel = otel;
    init_tracing(&options).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    loaded.log_outcome();

    let state = AppState::init(config, data_dir).await;
    let result = run(cli, state).await;

    shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> Result<()> {
    match cli.command {
        Commands::Serve { host, port, .. } => {
            cli::serve::serve(state, host, port).await?;
        }

        Commands::Ask {
            message,
            session,
            model,
            temperature,
            max_tokens,
            stream,
        } => {
            let request = ChatRequest {
                session_id: session,
                message,
                model,
                temperature,
                max_tokens,
            };
            cli::ask::ask(&state, request, stream, cli.json).await?;
        }

        Commands::History { action } => match action {
            HistoryAction::Show { session, limit } => {
                cli::history::show(&state, &session, limit, cli.json).await?;
            }
            HistoryAction::Clear { session, yes } => {
                cli::history::clear(&state, &session, yes, cli.json).await?;
            }
        },

        // Handled before state initialization.
        Commands::Completions { .. } => {}
    }

    Ok(())
}
