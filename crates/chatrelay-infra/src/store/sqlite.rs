//! SQLite session store.
//!
//! Implements `SessionStore` from `chatrelay-core` on top of [`DatabasePool`].
//! Expiry is stored per session as an epoch-millisecond deadline; expired
//! sessions are invisible to reads and are dropped by the next write to the
//! same session or by [`SessionStore::purge_expired`].

use std::time::Duration;

use chrono::Utc;
use sqlx::Row;

use chatrelay_core::history::SessionStore;
use chatrelay_types::chat::{Turn, TurnRole};
use chatrelay_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_after(now: i64, ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now.saturating_add(ttl_ms)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection(e.to_string())
        }
        other => RepositoryError::Query(other.to_string()),
    }
}

fn turn_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, RepositoryError> {
    let role: String = row.try_get("role").map_err(query_err)?;
    let content: String = row.try_get("content").map_err(query_err)?;
    let role = role.parse::<TurnRole>().map_err(RepositoryError::Corrupt)?;
    Ok(Turn { role, content })
}

impl SessionStore for SqliteSessionStore {
    async fn tail(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, RepositoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r#"SELECT role, content FROM (
                   SELECT t.id, t.role, t.content
                   FROM session_turns t
                   JOIN sessions s ON s.session_id = t.session_id
                   WHERE t.session_id = ? AND s.expires_at > ?
                   ORDER BY t.id DESC
                   LIMIT ?
               ) ORDER BY id ASC"#,
        )
        .bind(session_id)
        .bind(now_millis())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(turn_from_row).collect()
    }

    async fn push_exchange(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        let now = now_millis();
        let expires_at = expiry_after(now, ttl);

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        // An expired session starts over instead of resurrecting old turns.
        sqlx::query("DELETE FROM sessions WHERE session_id = ? AND expires_at <= ?")
            .bind(session_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO sessions (session_id, expires_at, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT (session_id) DO UPDATE SET expires_at = excluded.expires_at, updated_at = excluded.updated_at"#,
        )
        .bind(session_id)
        .bind(expires_at)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        for (role, content) in [(TurnRole::User, user), (TurnRole::Assistant, assistant)] {
            sqlx::query(
                "INSERT INTO session_turns (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(session_id)
            .bind(role.to_string())
            .bind(content)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(())
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions WHERE expires_at > ?")
            .bind(now_millis())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let n: i64 = row.try_get("n").map_err(query_err)?;
        Ok(n.max(0) as u64)
    }

    async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_millis())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected())
    }
}
