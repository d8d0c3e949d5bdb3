//! # Key-Value Boxes
//!
//! The durable store contract the sync queue and the resource cache sit on.
//! A *box* is a named section of the store holding JSON values keyed by
//! string. Values survive process restarts when the box comes from a
//! [`LocalDatabase`]; [`MemoryBackend`] offers the same contract in memory.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fitsync::client::local_db::{LocalDatabase, StoreBackend};
//!
//! # async fn example() -> Result<(), fitsync::client::local_db::StoreError> {
//! let db = LocalDatabase::open_in_memory().await?;
//! let settings = db.open_box("settings").await?;
//!
//! settings.put("units", &serde_json::json!("metric")).await?;
//! assert_eq!(settings.get("units").await?, Some(serde_json::json!("metric")));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by the durable store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite database failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another process holds the database
    #[error("database {0} is locked by another process")]
    Locked(PathBuf),
}

/// One named section of the durable store
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Box name
    fn name(&self) -> &str;

    /// Insert or overwrite the value stored under `key`
    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys in the box, in ascending order
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// All key/value pairs in the box, in ascending key order
    async fn entries(&self) -> Result<Vec<(String, Value)>, StoreError> {
        let mut entries = Vec::new();
        for key in self.keys().await? {
            if let Some(value) = self.get(&key).await? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }
}

/// Something that can open named boxes
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Open (creating if needed) the box called `name`
    async fn open_box(&self, name: &str) -> Result<Arc<dyn KeyValueStore>, StoreError>;
}

/// A box stored in the `kv_entries` table of a [`LocalDatabase`](super::LocalDatabase)
#[derive(Debug, Clone)]
pub struct SqliteBox {
    pool: SqlitePool,
    name: String,
}

impl SqliteBox {
    pub(crate) fn new(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteBox {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO kv_entries (box_name, key, value, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (box_name, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(&self.name)
        .bind(key)
        .bind(encoded)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE box_name = ? AND key = ?")
            .bind(&self.name)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value")?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM kv_entries WHERE box_name = ? AND key = ?")
            .bind(&self.name)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT key FROM kv_entries WHERE box_name = ? ORDER BY key ASC")
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await?;

        let mut keys = Vec::with_capacity(rows.len());
        for row in rows {
            keys.push(row.try_get("key")?);
        }
        Ok(keys)
    }

    async fn entries(&self) -> Result<Vec<(String, Value)>, StoreError> {
        let rows =
            sqlx::query("SELECT key, value FROM kv_entries WHERE box_name = ? ORDER BY key ASC")
                .bind(&self.name)
                .fetch_all(&self.pool)
                .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key")?;
            let raw: String = row.try_get("value")?;
            entries.push((key, serde_json::from_str(&raw)?));
        }
        Ok(entries)
    }
}

/// In-memory box
#[derive(Debug, Default)]
pub struct MemoryBox {
    name: String,
    entries: RwLock<BTreeMap<String, Value>>,
}

#[async_trait]
impl KeyValueStore for MemoryBox {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn entries(&self) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

/// Process-local backend. Opening the same name twice yields the same box,
/// so a queue re-created on the same backend sees earlier writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    boxes: Arc<RwLock<HashMap<String, Arc<MemoryBox>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn open_box(&self, name: &str) -> Result<Arc<dyn KeyValueStore>, StoreError> {
        let mut boxes = self.boxes.write().await;
        let entry = boxes.entry(name.to_string()).or_insert_with(|| {
            Arc::new(MemoryBox {
                name: name.to_string(),
                entries: RwLock::new(BTreeMap::new()),
            })
        });
        Ok(entry.clone() as Arc<dyn KeyValueStore>)
    }
}
