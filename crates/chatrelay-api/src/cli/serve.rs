//! `chatrelay serve`: HTTP relay with background session purging.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::http;
use crate::state::{AppState, ConcreteRelayService};

/// Bind, serve until Ctrl+C/SIGTERM, then stop the purge task.
pub async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let cancel = CancellationToken::new();
    let purge = spawn_purge_task(
        Arc::clone(&state.relay),
        Duration::from_secs(state.config.history.purge_interval_secs),
        cancel.clone(),
    );

    println!(
        "  {} {} listening on {}",
        style("⚡").bold(),
        style(&state.config.app_name).bold(),
        style(format!("http://{addr}")).cyan()
    );
    println!(
        "  {}",
        style(format!(
            "model {} via {}, history {}",
            state.relay.settings().default_model,
            state.config.provider.base_url,
            if state.relay.history().is_available() {
                state.config.history.backend.to_string()
            } else {
                "disabled".to_string()
            }
        ))
        .dim()
    );
    println!(
        "  {}",
        style(format!("data directory {}", state.data_dir.display())).dim()
    );
    println!("  {}", style("Press Ctrl+C to stop").dim());
    info!(%addr, "Relay listening");

    let router = http::router::build_router(state);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    if let Err(e) = purge.await {
        warn!(error = %e, "Purge task ended abnormally");
    }

    served.context("Server error")?;
    println!("\n  Server stopped.");
    Ok(())
}

/// Periodically drop expired sessions until `cancel` fires.
pub fn spawn_purge_task(
    relay: Arc<ConcreteRelayService>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    // interval() rejects a zero period.
    let every = every.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    relay.history().purge_expired().await;
                }
            }
        }
    })
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
