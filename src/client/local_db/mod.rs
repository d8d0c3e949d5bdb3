//! # Local Database Module
//!
//! Local SQLite storage for offline-first operation. The database is a set of
//! named key-value boxes in a single `kv_entries` table; the sync queue and the
//! resource cache each own one box.
//!
//! ## Key Components
//!
//! - `LocalDatabase`: connection pool, schema migrations and box factory
//! - `store.rs`: the `KeyValueStore`/`StoreBackend` contract and its SQLite and in-memory implementations
//! - `cache.rs`: typed resource cache with last-updated metadata
//! - `schema.rs`: box names and migrations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fitsync::client::local_db::{LocalDatabase, StoreBackend};
//!
//! # async fn example() -> Result<(), fitsync::client::local_db::StoreError> {
//! let db = LocalDatabase::open(LocalDatabase::default_path()).await?;
//! let queue_box = db.open_box("sync_queue").await?;
//! println!("{} queued operations", queue_box.keys().await?.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Process ownership
//!
//! A file-backed database is opened with SQLite's exclusive locking mode on a
//! single connection, so exactly one process can use a database file at a
//! time. A second process gets [`StoreError::Locked`].

pub mod cache;
pub mod schema;
pub mod store;

pub use cache::{CacheBox, Cached};
pub use schema::{FITNESS_CACHE_BOX, SYNC_QUEUE_BOX};
pub use store::{KeyValueStore, MemoryBackend, MemoryBox, SqliteBox, StoreBackend, StoreError};

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqliteLockingMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Local database connection manager
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Creates missing parent directories, enables WAL, takes the exclusive
    /// process lock and applies pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .locking_mode(SqliteLockingMode::Exclusive)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(250))
            .foreign_keys(true);

        let pool = Self::pool_options()
            .connect_with(options)
            .await
            .map_err(|e| Self::map_lock_error(e, &path))?;

        let db = Self {
            pool,
            path: Some(path.clone()),
        };
        db.acquire_process_lock()
            .await
            .map_err(|e| match e {
                StoreError::Database(inner) => Self::map_lock_error(inner, &path),
                other => other,
            })?;
        db.run_migrations().await?;

        tracing::info!("[DB] Opened local database at {}", path.display());
        Ok(db)
    }

    /// Open a private in-memory database, mainly for tests and ephemeral sessions
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = Self::pool_options().connect_with(options).await?;

        let db = Self { pool, path: None };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Platform-specific default database location
    ///
    /// Uses the system's data directory when available.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("fitsync");
        path.push("local.db");
        path
    }

    /// A single long-lived connection: required for in-memory databases and
    /// for holding the exclusive lock on file databases.
    fn pool_options() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    }

    /// In exclusive locking mode the lock taken by a write is held until the
    /// connection closes.
    async fn acquire_process_lock(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN EXCLUSIVE").execute(&mut *conn).await?;
        sqlx::query("COMMIT").execute(&mut *conn).await?;
        Ok(())
    }

    fn map_lock_error(err: sqlx::Error, path: &Path) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            // SQLITE_BUSY (5) / SQLITE_LOCKED (6), possibly as extended codes
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            if matches!(primary, Some(5) | Some(6)) {
                return StoreError::Locked(path.to_path_buf());
            }
        }
        StoreError::Database(err)
    }

    /// Apply every migration newer than the recorded schema version
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let (applied,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        for migration in schema::pending_migrations(applied) {
            tracing::info!(
                "[DB] Applying migration {} ({})",
                migration.version,
                migration.description
            );
            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(migration.version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Recorded schema version
    pub async fn schema_version(&self) -> Result<i32> {
        let (version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Get database statistics
    ///
    /// Returns entry counts for the boxes this crate manages.
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let (total_entries,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kv_entries")
            .fetch_one(&self.pool)
            .await?;

        let (queued_operations,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM kv_entries WHERE box_name = ?")
                .bind(SYNC_QUEUE_BOX)
                .fetch_one(&self.pool)
                .await?;

        let (cached_entries,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM kv_entries WHERE box_name = ? AND key NOT LIKE '\\_%' ESCAPE '\\'",
        )
        .bind(FITNESS_CACHE_BOX)
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            total_entries: total_entries as u64,
            queued_operations: queued_operations as u64,
            cached_entries: cached_entries as u64,
        })
    }

    /// Close the pool, releasing the process lock
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StoreBackend for LocalDatabase {
    async fn open_box(&self, name: &str) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(SqliteBox::new(self.pool.clone(), name)))
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Entries across every box
    pub total_entries: u64,
    /// Operations in the sync queue box, in any status
    pub queued_operations: u64,
    /// Cached resources, excluding metadata entries
    pub cached_entries: u64,
}
