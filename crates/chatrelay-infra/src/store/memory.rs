//! In-process session store on a concurrent map.
//!
//! Each session is one map entry, so an exchange is appended under that
//! entry's shard lock. Nothing survives a restart.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use chatrelay_core::history::SessionStore;
use chatrelay_types::chat::Turn;
use chatrelay_types::error::RepositoryError;

struct MemorySession {
    turns: Vec<Turn>,
    expires_at: Instant,
}

impl MemorySession {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// `DashMap`-backed implementation of `SessionStore`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, MemorySession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn tail(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, RepositoryError> {
        let now = Instant::now();
        let Some(session) = self.sessions.get(session_id) else {
            return Ok(Vec::new());
        };
        if session.is_expired(now) {
            return Ok(Vec::new());
        }

        let skip = session.turns.len().saturating_sub(limit);
        Ok(session.turns[skip..].to_vec())
    }

    async fn push_exchange(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        let now = Instant::now();
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| MemorySession {
                turns: Vec::new(),
                expires_at: now,
            });

        if session.is_expired(now) {
            session.turns.clear();
        }
        session.turns.push(Turn::user(user));
        session.turns.push(Turn::assistant(assistant));
        session.expires_at = now + ttl;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
        self.sessions.remove(session_id);
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        let now = Instant::now();
        let count = self
            .sessions
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count();
        Ok(count as u64)
    }

    async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}
