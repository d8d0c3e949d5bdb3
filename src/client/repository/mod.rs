//! # Offline-First Repository
//!
//! Every read and write of fitness data goes through the same policy:
//!
//! - **Reads** try the server first. A fresh answer overwrites the cached copy
//!   of that resource; any failure falls back to the cached copy, and with no
//!   cached copy the read fails with [`RepositoryError::NoDataAvailable`].
//! - **Writes** try the server first. A failure wraps the mutation as a
//!   [`SyncOperation`] and enqueues it for the sync driver to replay. The
//!   caller gets a [`WriteOutcome`] either way.
//!
//! While the queue still holds earlier writes, new writes are queued behind
//! them instead of being sent directly, so the server sees mutations in the
//! order they were made. A [`NetworkMonitor`] that reports offline skips the
//! remote attempt altogether.
//!
//! The per-resource operations live in `steps.rs`, `goals.rs` and `profile.rs`.

mod goals;
mod profile;
mod steps;

use crate::client::api::{ApiError, RemoteApi};
use crate::client::local_db::{CacheBox, StoreBackend, StoreError, FITNESS_CACHE_BOX};
use crate::client::offline::{OperationPayload, QueueError, SyncOperation, SyncQueue};
use crate::client::sync::NetworkMonitor;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Cache key for today's statistics
pub const TODAY_STATS_KEY: &str = "today_stats";
/// Cache key for the seven-day trend
pub const WEEKLY_TREND_KEY: &str = "weekly_trend";
/// Cache key for the goal list
pub const GOALS_KEY: &str = "goals";
/// Cache key for the user profile
pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Remote fetch failed and nothing is cached
    #[error("no data available for {resource}")]
    NoDataAvailable { resource: &'static str },

    #[error("failed to queue operation: {0}")]
    Queue(#[from] QueueError),

    #[error("cache error: {0}")]
    Cache(#[from] StoreError),
}

/// Where a read was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    Cache,
}

/// A read result tagged with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct Fresh<T> {
    pub value: T,
    pub source: DataSource,
    /// When the cached copy was written; `None` for remote values
    pub cached_at: Option<DateTime<Utc>>,
}

impl<T> Fresh<T> {
    fn remote(value: T) -> Self {
        Self {
            value,
            source: DataSource::Remote,
            cached_at: None,
        }
    }

    /// Served from the cache rather than the server
    pub fn is_stale(&self) -> bool {
        self.source == DataSource::Cache
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Result of a write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    /// The server accepted the write and returned its copy
    Synced(T),
    /// The write was queued for replay; `local` is the value as submitted
    Queued { operation_id: String, local: T },
}

impl<T> WriteOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            WriteOutcome::Synced(value) => value,
            WriteOutcome::Queued { local, .. } => local,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            WriteOutcome::Synced(value) => value,
            WriteOutcome::Queued { local, .. } => local,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued { .. })
    }

    pub fn operation_id(&self) -> Option<&str> {
        match self {
            WriteOutcome::Synced(_) => None,
            WriteOutcome::Queued { operation_id, .. } => Some(operation_id),
        }
    }
}

/// Offline-first access to fitness data
#[derive(Debug, Clone)]
pub struct OfflineFirstRepository {
    api: Arc<dyn RemoteApi>,
    cache: CacheBox,
    queue: Arc<SyncQueue>,
    network: Option<Arc<NetworkMonitor>>,
}

impl OfflineFirstRepository {
    pub fn new(api: Arc<dyn RemoteApi>, cache: CacheBox, queue: Arc<SyncQueue>) -> Self {
        Self {
            api,
            cache,
            queue,
            network: None,
        }
    }

    /// Use the `fitness_cache` box of `backend` as the cache
    pub async fn open(
        api: Arc<dyn RemoteApi>,
        backend: &dyn StoreBackend,
        queue: Arc<SyncQueue>,
    ) -> Result<Self, RepositoryError> {
        let cache = CacheBox::open(backend, FITNESS_CACHE_BOX).await?;
        Ok(Self::new(api, cache, queue))
    }

    /// Skip remote calls while `monitor` reports offline
    pub fn with_network_monitor(mut self, monitor: Arc<NetworkMonitor>) -> Self {
        self.network = Some(monitor);
        self
    }

    pub fn cache(&self) -> &CacheBox {
        &self.cache
    }

    pub fn queue(&self) -> &Arc<SyncQueue> {
        &self.queue
    }

    fn known_offline(&self) -> bool {
        self.network
            .as_ref()
            .is_some_and(|monitor| !monitor.is_online())
    }

    /// Remote-first read with cache fallback
    async fn read_through<T, F>(&self, key: &'static str, fetch: F) -> Result<Fresh<T>, RepositoryError>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T, ApiError>>,
    {
        let error = if self.known_offline() {
            ApiError::Network("offline".to_string())
        } else {
            match fetch.await {
                Ok(value) => {
                    if let Err(e) = self.cache.put(key, &value).await {
                        tracing::warn!("[REPO] Failed to cache {}: {}", key, e);
                    }
                    return Ok(Fresh::remote(value));
                }
                Err(e) => e,
            }
        };

        match self.cache.get::<T>(key).await? {
            Some(cached) => {
                tracing::debug!("[REPO] Serving cached {} ({})", key, error);
                Ok(Fresh {
                    value: cached.value,
                    source: DataSource::Cache,
                    cached_at: cached.updated_at,
                })
            }
            None => {
                tracing::warn!("[REPO] No data for {}: {}", key, error);
                Err(RepositoryError::NoDataAvailable { resource: key })
            }
        }
    }

    /// Remote-first write that queues `payload` when the server can't take it
    async fn write_or_enqueue<T, F>(
        &self,
        remote: F,
        payload: OperationPayload,
        local: T,
    ) -> Result<WriteOutcome<T>, RepositoryError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let op_type = payload.operation_type();

        let reason = if self.known_offline() {
            "offline".to_string()
        } else if self.queue.pending_count().await > 0 {
            "earlier writes are still queued".to_string()
        } else {
            match remote.await {
                Ok(value) => return Ok(WriteOutcome::Synced(value)),
                Err(e) => e.to_string(),
            }
        };

        let operation = SyncOperation::from_payload(payload);
        let operation_id = operation.id.clone();
        self.queue.enqueue(operation).await?;

        tracing::info!("[REPO] Queued {} as {} ({})", op_type, operation_id, reason);
        Ok(WriteOutcome::Queued {
            operation_id,
            local,
        })
    }

    /// Cache bookkeeping after a write; failures are logged, never returned
    async fn update_cache<F>(&self, what: &str, update: F)
    where
        F: Future<Output = Result<(), StoreError>>,
    {
        if let Err(e) = update.await {
            tracing::warn!("[REPO] Failed to update cached {}: {}", what, e);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::client::api::fake::FakeApi;
    use crate::client::local_db::MemoryBackend;

    pub(crate) struct Harness {
        pub api: Arc<FakeApi>,
        pub queue: Arc<SyncQueue>,
        pub repo: OfflineFirstRepository,
    }

    pub(crate) async fn harness() -> Harness {
        let backend = MemoryBackend::new();
        let queue = Arc::new(SyncQueue::new(Arc::new(backend.clone())));
        queue.initialize().await.unwrap();

        let api = Arc::new(FakeApi::new());
        let repo = OfflineFirstRepository::open(api.clone(), &backend, queue.clone())
            .await
            .unwrap();
        Harness { api, queue, repo }
    }
}
