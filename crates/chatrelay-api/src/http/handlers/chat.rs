//! Chat endpoints.
//!
//! - POST /api/v1/chat         - blocking chat, reply in the envelope
//! - POST /api/v1/chat/stream  - Server-Sent Events
//!
//! SSE framing: each fragment is one `data:` event, success ends with
//! `data: [DONE]`, failure ends with `data: {"error": "..."}`. Keep-alive
//! comments are sent while the upstream is quiet. A fragment containing
//! newlines is split across several `data:` lines, which SSE clients join
//! back with `\n`.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tracing::info;

use chatrelay_types::chat::{ChatReply, ChatRequest, RelayEvent};

use crate::http::error::{AppError, RequestError};
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Terminal success marker.
pub const DONE_MARKER: &str = "[DONE]";

/// Parse and validate the request body.
fn accept(payload: Result<Json<ChatRequest>, JsonRejection>) -> Result<ChatRequest, AppError> {
    let Json(request) = payload?;
    request.validate()?;
    Ok(request)
}

/// Map one relay event to its SSE frame.
pub fn sse_event(event: RelayEvent) -> Event {
    match event {
        RelayEvent::Fragment(text) => Event::default().data(text),
        RelayEvent::Done => Event::default().data(DONE_MARKER),
        RelayEvent::Error(message) => Event::default().data(json!({ "error": message }).to_string()),
    }
}

/// POST /api/v1/chat - Blocking chat.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ChatReply>>, RequestError> {
    let timer = RequestTimer::start();
    let request = accept(payload).map_err(|e| timer.fail(e))?;

    let reply = state
        .relay
        .chat(&request)
        .await
        .map_err(|e| timer.fail(e))?;

    info!(
        request_id = %timer.request_id,
        session_id = %reply.session_id,
        model = %reply.model,
        elapsed_ms = timer.elapsed_ms(),
        "Chat completed"
    );
    Ok(Json(timer.success(reply)))
}

/// POST /api/v1/chat/stream - Streaming chat over SSE.
///
/// Validation failures are returned as a normal 400 envelope; once the
/// stream is open, upstream failures arrive in-band as the error event.
pub async fn stream_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RequestError> {
    let timer = RequestTimer::start();
    let request = accept(payload).map_err(|e| timer.fail(e))?;
    info!(session_id = %request.session_id, "Opening chat stream");

    let events = state
        .relay
        .chat_stream(request)
        .map(|event| Ok::<_, Infallible>(sse_event(event)));

    let keep_alive = KeepAlive::new().interval(keep_alive_interval(state.config.stream.keep_alive_secs));
    Ok(Sse::new(events).keep_alive(keep_alive))
}

/// Keep-alive period; a zero setting would emit a comment on every idle poll.
fn keep_alive_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}
