//! Chat request/reply, session turn, and relay event types.
//!
//! A session is an ordered list of [`Turn`]s, appended in user/assistant
//! pairs. [`ChatRequest`] is the inbound shape accepted by both the blocking
//! and the streaming chat operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Lowest accepted sampling temperature.
pub const MIN_TEMPERATURE: f64 = 0.0;
/// Highest accepted sampling temperature.
pub const MAX_TEMPERATURE: f64 = 2.0;
/// Lowest accepted output token bound.
pub const MIN_MAX_TOKENS: u32 = 1;
/// Highest accepted output token bound.
pub const MAX_MAX_TOKENS: u32 = 4000;

/// Author of a stored turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Label used when the turn is rendered into a prompt line.
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// One utterance stored in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Renders as a single prompt line, e.g. `User: Hi`.
impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role.label(), self.content)
    }
}

/// Inbound chat request.
///
/// Optional fields fall back to configured defaults in the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Request with only the required fields set.
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Check field presence and ranges before the request reaches the relay.
    ///
    /// Only empty strings are rejected; whitespace is a valid message.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.session_id.is_empty() {
            return Err(ValidationError::Empty("session_id"));
        }
        if self.message.is_empty() {
            return Err(ValidationError::Empty("message"));
        }
        if let Some(t) = self.temperature {
            if !t.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) {
                return Err(ValidationError::OutOfRange {
                    field: "temperature",
                    detail: format!("{t} is outside {MIN_TEMPERATURE}..={MAX_TEMPERATURE}"),
                });
            }
        }
        if let Some(n) = self.max_tokens {
            if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&n) {
                return Err(ValidationError::OutOfRange {
                    field: "max_tokens",
                    detail: format!("{n} is outside {MIN_MAX_TOKENS}..={MAX_MAX_TOKENS}"),
                });
            }
        }
        Ok(())
    }

    /// The requested model, treating a blank string as absent.
    pub fn requested_model(&self) -> Option<&str> {
        self.model.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// Result of a completed blocking chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub session_id: String,
    pub model: String,
}

/// One item delivered to a streaming caller.
///
/// A relay stream is zero or more `Fragment`s followed by exactly one
/// terminal `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RelayEvent {
    Fragment(String),
    Done,
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_roundtrip() {
        for role in [TurnRole::User, TurnRole::Assistant] {
            let parsed: TurnRole = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert!("system".parse::<TurnRole>().is_err());
    }

    #[test]
    fn test_turn_display_is_prompt_line() {
        assert_eq!(Turn::user("Hi").to_string(), "User: Hi");
        assert_eq!(Turn::assistant("Hello there").to_string(), "Assistant: Hello there");
    }

    #[test]
    fn test_validate_accepts_single_character_message() {
        assert!(ChatRequest::new("s1", "a").validate().is_ok());
        assert!(ChatRequest::new("s1", " ").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_message() {
        let err = ChatRequest::new("s1", "").validate().unwrap_err();
        assert!(matches!(err, ValidationError::Empty("message")));
    }

    #[test]
    fn test_validate_rejects_empty_session() {
        let err = ChatRequest::new("", "Hi").validate().unwrap_err();
        assert!(matches!(err, ValidationError::Empty("session_id")));
    }

    #[test]
    fn test_validate_temperature_bounds() {
        let mut req = ChatRequest::new("s1", "Hi");
        for ok in [0.0, 0.7, 2.0] {
            req.temperature = Some(ok);
            assert!(req.validate().is_ok(), "{ok} should be accepted");
        }
        for bad in [-0.1, 2.01, f64::NAN, f64::INFINITY] {
            req.temperature = Some(bad);
            assert!(req.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_validate_max_tokens_bounds() {
        let mut req = ChatRequest::new("s1", "Hi");
        req.max_tokens = Some(1);
        assert!(req.validate().is_ok());
        req.max_tokens = Some(4000);
        assert!(req.validate().is_ok());
        req.max_tokens = Some(0);
        assert!(req.validate().is_err());
        req.max_tokens = Some(4001);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_requested_model_blank_is_absent() {
        let mut req = ChatRequest::new("s1", "Hi");
        assert_eq!(req.requested_model(), None);
        req.model = Some("  ".to_string());
        assert_eq!(req.requested_model(), None);
        req.model = Some("qwen-max".to_string());
        assert_eq!(req.requested_model(), Some("qwen-max"));
    }

    #[test]
    fn test_chat_request_optional_fields_default() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"session_id":"s1","message":"Hello"}"#).unwrap();
        assert!(req.model.is_none());
        assert!(req.temperature.is_none());
        assert!(req.max_tokens.is_none());
    }
}
