//! Upstream completion request and error types.
//!
//! These model the data shapes exchanged with the remote LLM provider:
//! a single synthesized prompt plus sampling parameters, and the failures
//! that can come back from it.

use serde::{Deserialize, Serialize};

/// Request to the upstream provider for a completion.
///
/// The relay always sends one user-role message holding the whole prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Errors from upstream provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("could not reach upstream: {0}")]
    Connection(String),

    #[error("upstream timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("upstream returned no completion")]
    Empty,

    #[error("upstream authentication failed")]
    AuthenticationFailed,

    #[error("upstream rate limited")]
    RateLimited,

    #[error("upstream error: {message}")]
    Provider { message: String },

    #[error("upstream stream interrupted: {0}")]
    Stream(String),
}

impl UpstreamError {
    /// Stable machine-readable token for the failure kind.
    pub fn reason(&self) -> &'static str {
        match self {
            UpstreamError::Connection(_) => "connection",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::Malformed(_) => "malformed",
            UpstreamError::Empty => "empty",
            UpstreamError::AuthenticationFailed => "authentication",
            UpstreamError::RateLimited => "rate_limited",
            UpstreamError::Provider { .. } => "provider",
            UpstreamError::Stream(_) => "stream",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_tokens() {
        assert_eq!(UpstreamError::Timeout { after_ms: 10 }.reason(), "timeout");
        assert_eq!(UpstreamError::Empty.reason(), "empty");
        assert_eq!(UpstreamError::Stream("reset".into()).reason(), "stream");
        assert_eq!(
            UpstreamError::Provider {
                message: "bad".into()
            }
            .reason(),
            "provider"
        );
    }

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Timeout { after_ms: 30_000 };
        assert_eq!(err.to_string(), "upstream timed out after 30000ms");
        assert!(err.is_timeout());
        assert!(!UpstreamError::Empty.is_timeout());
    }
}
