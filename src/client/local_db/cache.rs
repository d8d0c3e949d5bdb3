//! Resource cache over a key-value box.
//!
//! Each cached resource is stored under its own key. Its last refresh time is
//! kept next to it under an underscore-prefixed metadata key, and metadata keys
//! are hidden from [`CacheBox::records`].

use super::store::{KeyValueStore, StoreBackend, StoreError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const METADATA_PREFIX: char = '_';

fn updated_at_key(key: &str) -> String {
    format!("{}updated_at:{}", METADATA_PREFIX, key)
}

/// A cached value and when it was written
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Typed JSON cache
#[derive(Debug, Clone)]
pub struct CacheBox {
    store: Arc<dyn KeyValueStore>,
}

impl CacheBox {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Open the box `name` on `backend` as a cache
    pub async fn open(backend: &dyn StoreBackend, name: &str) -> Result<Self, StoreError> {
        Ok(Self::new(backend.open_box(name).await?))
    }

    /// Read and decode the resource stored under `key`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Cached<T>>, StoreError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        let value = serde_json::from_value(raw)?;
        let updated_at = self.last_updated(key).await?;
        Ok(Some(Cached { value, updated_at }))
    }

    /// Overwrite the resource under `key` and stamp its refresh time
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        self.store.put(key, &serde_json::to_value(value)?).await?;
        self.store
            .put(&updated_at_key(key), &serde_json::to_value(Utc::now())?)
            .await
    }

    /// Drop the resource and its metadata
    pub async fn invalidate(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await?;
        self.store.delete(&updated_at_key(key)).await
    }

    pub async fn last_updated(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.store.get(&updated_at_key(key)).await? {
            Some(raw) => Ok(serde_json::from_value(raw).ok()),
            None => Ok(None),
        }
    }

    /// Keys of cached resources, without metadata entries
    pub async fn records(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| !key.starts_with(METADATA_PREFIX))
            .collect())
    }

    /// Remove everything, metadata included
    pub async fn clear(&self) -> Result<(), StoreError> {
        for key in self.store.keys().await? {
            self.store.delete(&key).await?;
        }
        Ok(())
    }
}
