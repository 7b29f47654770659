//! CLI command definitions for the `chatrelay` binary.
//!
//! `serve` runs the HTTP relay; `ask` and `history` drive the same relay
//! service directly from the terminal.

pub mod ask;
pub mod history;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Session-aware chat relay in front of an OpenAI-compatible provider.
#[derive(Parser)]
#[command(name = "chatrelay", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to `config.toml` in the data directory).
    #[arg(long, global = true, env = "CHATRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP relay.
    Serve {
        /// Host to bind to (overrides `server.host`).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides `server.port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Export spans to stdout via OpenTelemetry.
        #[arg(long)]
        otel: bool,

        /// Write logs as JSON lines.
        #[arg(long)]
        log_json: bool,
    },

    /// Send one message through the relay and print the reply.
    Ask {
        /// Message to send.
        message: String,

        /// Conversation to continue.
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Model override.
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature (0.0 to 2.0).
        #[arg(short, long)]
        temperature: Option<f64>,

        /// Output token bound (1 to 4000).
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Print the reply as it is generated.
        #[arg(long)]
        stream: bool,
    },

    /// Inspect or clear a session's stored history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show the most recent turns of a session.
    Show {
        /// Session identifier.
        session: String,

        /// Number of turns (defaults to `history.max_turns`).
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete every stored turn of a session.
    #[command(alias = "rm")]
    Clear {
        /// Session identifier.
        session: String,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Default log filter from verbosity flags and `config.debug`.
///
/// `RUST_LOG` still wins when set. The server logs at `info` by default;
/// one-shot commands stay at `warn` so replies are not buried.
pub fn log_filter(verbose: u8, quiet: bool, debug: bool, serving: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 if debug => "info,chatrelay=debug",
        0 if serving => "info",
        0 => "warn",
        1 => "info,chatrelay=debug",
        _ => "trace",
    }
}
