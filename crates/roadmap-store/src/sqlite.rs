//! SQLite store
//!
//! One pool serves both tables. The database runs in WAL mode with a busy
//! timeout so concurrent writers queue on the file lock instead of failing.

use crate::error::{db_err, OpenError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQLite connection settings
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file
    pub path: PathBuf,
    /// Pool size
    pub max_connections: u32,
    /// How long a writer waits on a locked database
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    /// Default settings for a database file
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// With pool size
    #[inline]
    #[must_use]
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// With busy timeout
    #[inline]
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// SQLite-backed usage and report store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) and migrate
    ///
    /// # Errors
    /// Returns error if the directory cannot be created, the database cannot
    /// be opened, or the schema cannot be applied
    pub async fn open(config: &SqliteConfig) -> Result<Self, OpenError> {
        let path: &Path = &config.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!(
            path = %path.display(),
            max_connections = config.max_connections,
            "SQLite store ready"
        );
        Ok(store)
    }

    /// Private in-memory database
    ///
    /// Limited to one connection that is never recycled; every connection
    /// to `:memory:` sees its own empty database.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or migrated
    pub async fn open_in_memory() -> Result<Self, OpenError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the schema; idempotent
    ///
    /// # Errors
    /// Returns error if a statement fails
    pub async fn migrate(&self) -> Result<(), OpenError> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Connection pool
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Round-trip a trivial query
    ///
    /// # Errors
    /// Returns [`roadmap_core::StoreError::Unavailable`] if the pool is unusable
    pub async fn health_check(&self) -> Result<(), roadmap_core::StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Close all connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/roadmap.db");
        let store = SqliteStore::open(&SqliteConfig::new(&path)).await.unwrap();
        assert!(path.exists());
        store.close().await;
    }

    #[tokio::test]
    async fn count_check_constraint_holds() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO usage_counters (identity, tool, count, last_updated) VALUES ('x', 'business-credit', 31, 0)",
        )
        .execute(store.pool())
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn config_builder() {
        let config = SqliteConfig::new("a.db")
            .with_max_connections(0)
            .with_busy_timeout(Duration::from_millis(250));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }
}
