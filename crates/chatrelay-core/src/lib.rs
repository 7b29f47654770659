//! Relay orchestration and port definitions for chatrelay.
//!
//! This crate defines the "ports" (session store and completion client
//! traits) that the infrastructure layer implements, and the relay service
//! composing them. It depends only on `chatrelay-types` -- never on
//! `chatrelay-infra` or any database/HTTP crate.

pub mod completion;
pub mod history;
pub mod relay;
