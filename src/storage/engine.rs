//! Renshuu Storage Engine
//!
//! Owns the SQLite connection and exposes the async API used by the HTTP
//! layer. Table-specific operations live in sibling modules as further
//! `impl StorageEngine` blocks:
//! - `profiles`: registration, lookup, partial update
//! - `foods`: search, recents, admin catalog (foods, portions, add-ons)
//! - `meals`: meal lines with server-side meal/day recalculation
//! - `tracking`: daily summaries, goals, weight logs
//!
//! The connection sits behind a `std::sync::Mutex` because `rusqlite::Connection`
//! is `!Sync`. No guard is ever held across an `.await`.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{self, TABLES};

/// Configuration for the storage engine
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// How long a writer waits on a locked database (default: 5000)
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("renshuu_data/renshuu.db"),
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Default::default()
        }
    }
}

/// The main storage engine
#[derive(Clone)]
pub struct StorageEngine {
    config: StorageConfig,
    conn: Arc<Mutex<Connection>>,
}

impl StorageEngine {
    /// Open (or create) the database file and apply the schema
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.database_path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        schema::migrate(&conn)?;

        tracing::info!(path = %config.database_path.display(), "Opened database");

        Ok(Self {
            config,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;

        Ok(Self {
            config: StorageConfig::new(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Acquire the connection
    pub(crate) fn connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(format!("Failed to acquire connection lock: {}", e)))
    }

    /// Run `f` inside a transaction; it is rolled back if `f` fails
    pub(crate) fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Trivial read used by the health endpoint
    pub async fn ping(&self) -> StorageResult<i64> {
        let conn = self.connection()?;
        let count = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Row counts per table
    pub async fn stats(&self) -> StorageResult<StorageStats> {
        let conn = self.connection()?;

        let mut tables = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let rows: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            tables.push((table.to_string(), rows));
        }

        let storage_size_bytes = std::fs::metadata(&self.config.database_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StorageStats {
            tables,
            storage_size_bytes,
        })
    }

    /// Get the database file path
    pub fn database_path(&self) -> &Path {
        &self.config.database_path
    }
}

/// Fresh row id
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// (table, row count) in schema order
    pub tables: Vec<(String, i64)>,
    pub storage_size_bytes: u64,
}

impl StorageStats {
    pub fn rows(&self, table: &str) -> i64 {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| *rows)
            .unwrap_or(0)
    }
}

impl std::fmt::Display for StorageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<String> = self
            .tables
            .iter()
            .map(|(name, rows)| format!("{}: {}", name, rows))
            .collect();
        write!(
            f,
            "{}, Size: {:.2} MB",
            counts.join(", "),
            self.storage_size_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::PROFILES;
    use crate::storage::types::NewProfile;
    use tempfile::tempdir;

    async fn create_test_engine() -> (StorageEngine, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig::new(dir.path().join("db").join("renshuu.db"));
        let engine = StorageEngine::new(config).await.unwrap();
        (engine, dir)
    }

    #[tokio::test]
    async fn test_engine_creation() {
        let (engine, dir) = create_test_engine().await;
        assert!(dir.path().join("db").join("renshuu.db").exists());

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.tables.len(), TABLES.len());
        assert_eq!(stats.rows(PROFILES), 0);
    }

    #[tokio::test]
    async fn test_ping() {
        let engine = StorageEngine::in_memory().await.unwrap();
        assert_eq!(engine.ping().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("renshuu.db");

        {
            let engine = StorageEngine::new(StorageConfig::new(&path)).await.unwrap();
            engine
                .create_profile(
                    "user-1",
                    NewProfile {
                        full_name: "Ada".to_string(),
                        role: Default::default(),
                    },
                )
                .await
                .unwrap();
        }

        let engine = StorageEngine::new(StorageConfig::new(&path)).await.unwrap();
        let profile = engine.get_profile("user-1").await.unwrap();
        assert_eq!(profile.map(|p| p.full_name), Some("Ada".to_string()));
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let engine = StorageEngine::in_memory().await.unwrap();

        let result: StorageResult<()> = engine.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO profiles (id, full_name, role, created_at, updated_at)
                 VALUES ('x', 'X', 'client', ?1, ?1)",
                [now()],
            )?;
            Err(StorageError::Conflict("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(engine.ping().await.unwrap(), 0);
    }

    #[test]
    fn test_stats_display() {
        let stats = StorageStats {
            tables: vec![("profiles".to_string(), 2), ("foods".to_string(), 10)],
            storage_size_bytes: 1024 * 1024,
        };
        assert_eq!(stats.to_string(), "profiles: 2, foods: 10, Size: 1.00 MB");
    }
}
