//! Shared domain types for chatrelay.
//!
//! Requests, replies, session turns, relay events, upstream errors and the
//! process configuration shape used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
