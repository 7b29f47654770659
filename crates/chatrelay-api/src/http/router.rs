//! Axum router configuration with middleware.
//!
//! Relay routes live under `/api/v1/`; `/` and `/health` sit at the root.
//! Middleware: CORS (any origin), request tracing.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::stream_chat))
        .route(
            "/sessions/{session_id}/history",
            get(handlers::session::get_history),
        )
        .route(
            "/sessions/{session_id}",
            delete(handlers::session::clear_session),
        )
        .route("/stats", get(handlers::meta::get_stats));

    Router::new()
        .route("/", get(handlers::meta::welcome))
        .route("/health", get(handlers::meta::health_check))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
