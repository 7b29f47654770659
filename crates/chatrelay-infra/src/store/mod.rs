//! Session store backends and startup wiring.
//!
//! [`open_history`] turns the `[history]` config section into a ready
//! [`HistoryStore`]. A backend that cannot be opened yields a disabled
//! store so the relay keeps serving without memory.

pub mod memory;
pub mod pool;
pub mod sqlite;

use std::path::Path;
use std::time::Duration;

use tracing::{error, info};

use chatrelay_core::history::{HistoryStore, SessionStore};
use chatrelay_types::chat::Turn;
use chatrelay_types::config::{HistoryBackend, HistoryConfig};
use chatrelay_types::error::RepositoryError;

use self::memory::MemorySessionStore;
use self::pool::{DatabasePool, default_database_url};
use self::sqlite::SqliteSessionStore;

/// Runtime-selected session store.
pub enum AnySessionStore {
    Sqlite(SqliteSessionStore),
    Memory(MemorySessionStore),
}

impl SessionStore for AnySessionStore {
    async fn tail(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>, RepositoryError> {
        match self {
            AnySessionStore::Sqlite(s) => s.tail(session_id, limit).await,
            AnySessionStore::Memory(s) => s.tail(session_id, limit).await,
        }
    }

    async fn push_exchange(
        &self,
        session_id: &str,
        user: &str,
        assistant: &str,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        match self {
            AnySessionStore::Sqlite(s) => s.push_exchange(session_id, user, assistant, ttl).await,
            AnySessionStore::Memory(s) => s.push_exchange(session_id, user, assistant, ttl).await,
        }
    }

    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
        match self {
            AnySessionStore::Sqlite(s) => s.delete(session_id).await,
            AnySessionStore::Memory(s) => s.delete(session_id).await,
        }
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        match self {
            AnySessionStore::Sqlite(s) => s.count_active().await,
            AnySessionStore::Memory(s) => s.count_active().await,
        }
    }

    async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        match self {
            AnySessionStore::Sqlite(s) => s.purge_expired().await,
            AnySessionStore::Memory(s) => s.purge_expired().await,
        }
    }
}

/// Open the configured history backend.
///
/// SQLite defaults to `{data_dir}/history.db`; the directory is created if
/// missing. Any failure is logged and produces [`HistoryStore::disabled`].
pub async fn open_history(config: &HistoryConfig, data_dir: &Path) -> HistoryStore<AnySessionStore> {
    let ttl = Duration::from_secs(config.ttl_secs);

    match config.backend {
        HistoryBackend::Memory => {
            info!("Using in-memory session history");
            HistoryStore::new(AnySessionStore::Memory(MemorySessionStore::new()), ttl)
        }
        HistoryBackend::Sqlite => {
            let url = match &config.database_url {
                Some(url) => url.clone(),
                None => {
                    if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
                        error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
                    }
                    default_database_url(data_dir)
                }
            };

            match DatabasePool::new(&url).await {
                Ok(pool) => {
                    info!(%url, "Opened session history database");
                    HistoryStore::new(AnySessionStore::Sqlite(SqliteSessionStore::new(pool)), ttl)
                }
                Err(e) => {
                    error!(%url, error = %e, "History database unavailable, sessions will not be remembered");
                    HistoryStore::disabled()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_history() {
        let config = HistoryConfig {
            backend: HistoryBackend::Memory,
            ..HistoryConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let history = open_history(&config, dir.path()).await;

        assert!(history.is_available());
        assert!(history.append("s1", "Hi", "Hello").await);
        assert_eq!(history.load("s1", 20).await.len(), 2);
    }

    #[tokio::test]
    async fn test_open_sqlite_history_in_fresh_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let history = open_history(&HistoryConfig::default(), &data_dir).await;

        assert!(history.is_available());
        assert_eq!(history.ttl(), Duration::from_secs(86_400));
        assert!(history.append("s1", "Hi", "Hello").await);
        assert!(data_dir.join("history.db").exists());
        assert_eq!(history.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unreachable_database_disables_history() {
        let dir = tempfile::tempdir().unwrap();
        let config = HistoryConfig {
            database_url: Some(format!(
                "sqlite://{}",
                dir.path().join("missing").join("history.db").display()
            )),
            ..HistoryConfig::default()
        };
        let history = open_history(&config, dir.path()).await;

        assert!(!history.is_available());
        assert!(history.load("s1", 20).await.is_empty());
        assert!(!history.append("s1", "Hi", "Hello").await);
    }
}
