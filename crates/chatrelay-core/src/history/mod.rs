//! Session history with best-effort semantics.
//!
//! [`HistoryStore`] wraps an optional [`SessionStore`] backend and absorbs
//! every storage failure: reads degrade to an empty history, writes report
//! `false`. A relay built on a disabled store keeps serving, it just forgets.

pub mod store;

use std::time::Duration;

use chatrelay_types::chat::Turn;
use tracing::{debug, error, warn};

pub use self::store::SessionStore;

/// Default retention window for a session, measured from its last write.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Best-effort session history over a [`SessionStore`] backend.
pub struct HistoryStore<S: SessionStore> {
    backend: Option<S>,
    ttl: Duration,
}

impl<S: SessionStore> HistoryStore<S> {
    /// History backed by a reachable store.
    pub fn new(backend: S, ttl: Duration) -> Self {
        Self {
            backend: Some(backend),
            ttl,
        }
    }

    /// History with no backend; every operation is a logged no-op.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Up to `limit` most recent turns, oldest first.
    ///
    /// Returns an empty list for unknown sessions, an unavailable store, or
    /// a failed read.
    pub async fn load(&self, session_id: &str, limit: usize) -> Vec<Turn> {
        let Some(backend) = &self.backend else {
            warn!(session_id, "History store unavailable, returning empty history");
            return Vec::new();
        };
        if limit == 0 {
            return Vec::new();
        }

        match backend.tail(session_id, limit).await {
            Ok(turns) => {
                debug!(session_id, turns = turns.len(), "Loaded session history");
                turns
            }
            Err(e) => {
                error!(session_id, error = %e, "Failed to load session history");
                Vec::new()
            }
        }
    }

    /// Record a user/assistant exchange and refresh the session expiry.
    ///
    /// `false` means the exchange was not recorded; callers must not fail
    /// the user-visible reply because of it.
    pub async fn append(&self, session_id: &str, user: &str, assistant: &str) -> bool {
        let Some(backend) = &self.backend else {
            warn!(session_id, "History store unavailable, exchange not saved");
            return false;
        };

        match backend
            .push_exchange(session_id, user, assistant, self.ttl)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(session_id, error = %e, "Failed to save exchange");
                false
            }
        }
    }

    /// Remove all turns of a session immediately.
    pub async fn clear(&self, session_id: &str) -> bool {
        let Some(backend) = &self.backend else {
            warn!(session_id, "History store unavailable, cannot clear session");
            return false;
        };

        match backend.delete(session_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(session_id, error = %e, "Failed to clear session history");
                false
            }
        }
    }

    /// Number of live sessions; 0 when the store is unavailable.
    pub async fn session_count(&self) -> u64 {
        let Some(backend) = &self.backend else {
            return 0;
        };

        match backend.count_active().await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "Failed to count sessions");
                0
            }
        }
    }

    /// Drop expired sessions; returns how many went away.
    pub async fn purge_expired(&self) -> u64 {
        let Some(backend) = &self.backend else {
            return 0;
        };

        match backend.purge_expired().await {
            Ok(n) => {
                if n > 0 {
                    debug!(purged = n, "Purged expired sessions");
                }
                n
            }
            Err(e) => {
                warn!(error = %e, "Failed to purge expired sessions");
                0
            }
        }
    }
}
