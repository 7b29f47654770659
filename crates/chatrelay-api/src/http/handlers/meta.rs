//! Service-level endpoints: welcome, health and stats.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Welcome {
    pub message: String,
    pub app_name: String,
    pub version: &'static str,
    pub default_model: String,
}

#[derive(Debug, Serialize)]
pub struct RelayStats {
    pub active_sessions: u64,
    pub history_enabled: bool,
    pub provider: String,
    pub model: String,
}

/// GET / - Welcome banner.
pub async fn welcome(State(state): State<AppState>) -> Json<ApiResponse<Welcome>> {
    let timer = RequestTimer::start();
    Json(timer.success(Welcome {
        message: format!("Welcome to {}", state.config.app_name),
        app_name: state.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        default_model: state.relay.settings().default_model.clone(),
    }))
}

/// GET /health - Liveness check. Bare JSON, not enveloped.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/v1/stats - Live session count and relay settings.
pub async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<RelayStats>> {
    let timer = RequestTimer::start();
    let history = state.relay.history();

    Json(timer.success(RelayStats {
        active_sessions: history.session_count().await,
        history_enabled: history.is_available(),
        provider: state.relay.provider_name().to_string(),
        model: state.relay.settings().default_model.clone(),
    }))
}
