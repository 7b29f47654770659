//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use chatrelay_types::error::ValidationError;
use chatrelay_types::llm::UpstreamError;

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or out-of-range request; never reaches the relay.
    Validation(String),
    /// The upstream provider failed a blocking chat.
    Upstream(UpstreamError),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<UpstreamError> for AppError {
    fn from(e: UpstreamError) -> Self {
        AppError::Upstream(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upstream(e) if e.is_timeout() => "UPSTREAM_TIMEOUT",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
        }
    }
}

/// An [`AppError`] stamped with the id and elapsed time of the request
/// that failed, so error envelopes carry the same `meta` as success ones.
///
/// Built with [`RequestTimer::fail`](super::response::RequestTimer::fail).
#[derive(Debug)]
pub struct RequestError {
    pub error: AppError,
    pub request_id: String,
    pub response_time_ms: u64,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (message, details) = match &self.error {
            AppError::Validation(msg) => (msg.clone(), None),
            AppError::Upstream(e) => (e.to_string(), Some(json!({ "reason": e.reason() }))),
        };

        let body = ApiResponse::error(
            self.error.code(),
            &message,
            details,
            self.request_id,
            self.response_time_ms,
        );

        (self.error.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let validation = AppError::Validation("'message' must not be empty".to_string());
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.code(), "VALIDATION_ERROR");

        let timeout = AppError::from(UpstreamError::Timeout { after_ms: 60_000 });
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.code(), "UPSTREAM_TIMEOUT");

        let provider = AppError::from(UpstreamError::AuthenticationFailed);
        assert_eq!(provider.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(provider.code(), "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn test_error_envelope_carries_request_meta() {
        use http_body_util::BodyExt;

        let response = RequestError {
            error: AppError::from(UpstreamError::Timeout { after_ms: 100 }),
            request_id: "req-7".to_string(),
            response_time_ms: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["meta"]["request_id"], "req-7");
        assert_eq!(body["meta"]["response_time_ms"], 42);
        assert_eq!(body["errors"][0]["details"]["reason"], "timeout");
    }
}
