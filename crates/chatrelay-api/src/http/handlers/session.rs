//! Session history endpoints.
//!
//! - GET    /api/v1/sessions/{session_id}/history?limit=N
//! - DELETE /api/v1/sessions/{session_id}

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use chatrelay_types::chat::Turn;

use crate::http::error::{AppError, RequestError};
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Defaults to the configured prompt window (`history.max_turns`).
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SessionHistory {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct ClearedSession {
    pub session_id: String,
    /// `false` when the history store could not be reached.
    pub cleared: bool,
}

fn require_session_id(session_id: &str) -> Result<(), AppError> {
    if session_id.is_empty() {
        return Err(AppError::Validation("'session_id' must not be empty".to_string()));
    }
    Ok(())
}

/// GET /api/v1/sessions/{session_id}/history - Most recent turns, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<SessionHistory>>, RequestError> {
    let timer = RequestTimer::start();
    require_session_id(&session_id).map_err(|e| timer.fail(e))?;

    let limit = query.limit.unwrap_or(state.config.history.max_turns);
    let turns = state.relay.history().load(&session_id, limit).await;

    let link = format!("/api/v1/sessions/{session_id}/history");
    Ok(Json(
        timer
            .success(SessionHistory { session_id, turns })
            .with_link("self", &link),
    ))
}

/// DELETE /api/v1/sessions/{session_id} - Forget a session.
pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<ClearedSession>>, RequestError> {
    let timer = RequestTimer::start();
    require_session_id(&session_id).map_err(|e| timer.fail(e))?;

    let cleared = state.relay.history().clear(&session_id).await;
    Ok(Json(timer.success(ClearedSession { session_id, cleared })))
}
