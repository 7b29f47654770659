//! Infrastructure layer for chatrelay.
//!
//! Contains implementations of the ports defined in `chatrelay-core`:
//! SQLite and in-memory session stores, the OpenAI-compatible completion
//! client, and configuration loading.

pub mod config;
pub mod llm;
pub mod store;
