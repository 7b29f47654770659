//! SessionStore trait definition.
//!
//! The backend port behind [`super::HistoryStore`]: a keyed, append-only
//! list of turns per session with a retention window. Backends report
//! failures as [`RepositoryError`]; the wrapper decides how to degrade.

use std::time::Duration;

use chatrelay_types::chat::Turn;
use chatrelay_types::error::RepositoryError;

/// Trait for session history backends.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in chatrelay-infra.
pub trait SessionStore: Send + Sync {
    /// The last `limit` turns of a session, oldest first.
    ///
    /// Unknown and expired sessions yield an empty list, not an error.
    fn tail(
        &self,
        session_id: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Append a user turn followed by an assistant turn as one unit and
    /// reset the session's expiry to `ttl` from now.
    fn push_exchange(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove every turn of a session. No-op if the session does not exist.
    fn delete(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Number of sessions that have not expired.
    fn count_active(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Drop expired sessions, returning how many were removed.
    fn purge_expired(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
