//! # Sync Queue
//!
//! Durable FIFO queue of deferred mutations. Operations live in their own box
//! of the local store, keyed by operation id, so they survive restarts.
//!
//! ## Features
//!
//! - **Persistent Queue**: Operations survive app restarts
//! - **FIFO Claiming**: `dequeue` claims the oldest pending operation (timestamp, then sequence number)
//! - **Status Tracking**: pending → in progress → removed / failed
//! - **Retry Cap**: an operation with `max_retry` or more retries is failed, however it got there
//! - **Change Notifications**: subscribers receive the pending count after every mutation
//! - **Cleanup**: Remove old failed operations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fitsync::client::local_db::MemoryBackend;
//! use fitsync::client::offline::{OperationPayload, SyncOperation, SyncQueue};
//! use fitsync::shared::StepRecord;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), fitsync::client::offline::QueueError> {
//! let queue = SyncQueue::new(Arc::new(MemoryBackend::new()));
//! queue.initialize().await?;
//!
//! let record = StepRecord::new(chrono::Utc::now().date_naive(), 1200);
//! queue.enqueue(SyncOperation::from_payload(OperationPayload::CreateStep(record))).await?;
//!
//! while let Some(op) = queue.dequeue().await? {
//!     // Replay against the server...
//!     queue.mark_completed(&op.id).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::{KeyValueStore, StoreBackend, StoreError, SYNC_QUEUE_BOX};
use crate::client::offline::notifier::{QueueNotifier, QueueSubscription};
use crate::client::offline::operation::{OperationStatus, RecordError, SyncOperation};
use crate::shared::config::DEFAULT_MAX_RETRY;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Errors raised by queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    /// A method was called before `initialize`
    #[error("sync queue is not initialized")]
    NotInitialized,

    /// A method was called after `dispose`
    #[error("sync queue has been disposed")]
    Disposed,

    /// The backing store failed
    #[error("sync queue store error: {0}")]
    Store(#[from] StoreError),

    /// A stored operation could not be encoded or decoded
    #[error("operation {id} has an invalid record: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: RecordError,
    },
}

/// Durable FIFO queue of sync operations
#[derive(Debug)]
pub struct SyncQueue {
    backend: Arc<dyn StoreBackend>,
    box_name: String,
    max_retry: u32,
    store: RwLock<Option<Arc<dyn KeyValueStore>>>,
    /// Serializes every read-modify-write on the box
    op_lock: Mutex<()>,
    next_seq: AtomicU64,
    notifier: QueueNotifier,
    disposed: AtomicBool,
}

impl SyncQueue {
    /// Create a queue over `backend`. Call [`initialize`](Self::initialize) before use.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            box_name: SYNC_QUEUE_BOX.to_string(),
            max_retry: DEFAULT_MAX_RETRY,
            store: RwLock::new(None),
            op_lock: Mutex::new(()),
            next_seq: AtomicU64::new(1),
            notifier: QueueNotifier::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Override the retry cap (at least 1)
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Store operations in a differently named box
    pub fn with_box_name(mut self, name: impl Into<String>) -> Self {
        self.box_name = name.into();
        self
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Open the backing box. Calling this again is a no-op.
    pub async fn initialize(&self) -> Result<(), QueueError> {
        self.ensure_not_disposed()?;

        let mut slot = self.store.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let store = self.backend.open_box(&self.box_name).await?;
        let operations = Self::load_all(store.as_ref()).await?;
        let max_seq = operations.iter().map(|op| op.seq).max().unwrap_or(0);
        self.next_seq.store(max_seq + 1, Ordering::SeqCst);

        tracing::info!(
            "[QUEUE] Initialized '{}' with {} stored operations",
            self.box_name,
            operations.len()
        );
        *slot = Some(store);
        Ok(())
    }

    /// Persist `operation` under its id, replacing any previous operation with that id
    pub async fn enqueue(&self, operation: SyncOperation) -> Result<(), QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let mut operation = operation.with_seq(seq);
        if self.over_cap(&operation) && operation.status != OperationStatus::Failed {
            tracing::warn!(
                "[QUEUE] Operation {} arrived with {} retries (cap {}), storing as failed",
                operation.id,
                operation.retry_count,
                self.max_retry
            );
            operation = operation.with_status(OperationStatus::Failed);
        }
        Self::save(store.as_ref(), &operation).await?;

        tracing::debug!(
            "[QUEUE] Enqueued {} ({}) seq={}",
            operation.id,
            operation.operation_type(),
            seq
        );
        self.notify_changed(store.as_ref()).await;
        Ok(())
    }

    /// Claim the oldest pending operation, marking it in progress
    pub async fn dequeue(&self) -> Result<Option<SyncOperation>, QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        let next = Self::load_all(store.as_ref())
            .await?
            .into_iter()
            .filter(|op| self.status_of(op) == OperationStatus::Pending)
            .min_by(|a, b| a.order_key().cmp(&b.order_key()));

        let Some(next) = next else {
            return Ok(None);
        };

        let claimed = next.with_status(OperationStatus::InProgress);
        Self::save(store.as_ref(), &claimed).await?;

        tracing::debug!(
            "[QUEUE] Claimed {} ({}), retry {}",
            claimed.id,
            claimed.operation_type(),
            claimed.retry_count
        );
        self.notify_changed(store.as_ref()).await;
        Ok(Some(claimed))
    }

    /// Pending and in-progress operations in FIFO order
    pub async fn get_pending_operations(&self) -> Result<Vec<SyncOperation>, QueueError> {
        let store = self.store().await?;
        let mut operations: Vec<SyncOperation> = Self::load_all(store.as_ref())
            .await?
            .into_iter()
            .filter(|op| self.status_of(op).is_pending())
            .collect();
        Self::sort_fifo(&mut operations);
        Ok(operations)
    }

    /// Terminally failed operations in FIFO order
    pub async fn get_failed_operations(&self) -> Result<Vec<SyncOperation>, QueueError> {
        let store = self.store().await?;
        let mut operations: Vec<SyncOperation> = Self::load_all(store.as_ref())
            .await?
            .into_iter()
            .filter(|op| self.status_of(op) == OperationStatus::Failed)
            .map(|op| op.with_status(OperationStatus::Failed))
            .collect();
        Self::sort_fifo(&mut operations);
        Ok(operations)
    }

    /// Look up a single operation
    pub async fn get_operation(&self, id: &str) -> Result<Option<SyncOperation>, QueueError> {
        let store = self.store().await?;
        Self::load_one(store.as_ref(), id).await
    }

    /// Remove a replayed operation. No-op if absent.
    pub async fn mark_completed(&self, id: &str) -> Result<(), QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        if store.get(id).await?.is_none() {
            return Ok(());
        }
        store.delete(id).await?;

        tracing::debug!("[QUEUE] Completed {}", id);
        self.notify_changed(store.as_ref()).await;
        Ok(())
    }

    /// Mark an operation as terminally failed. No-op if absent.
    pub async fn mark_failed(&self, id: &str) -> Result<(), QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        let Some(operation) = Self::load_one(store.as_ref(), id).await? else {
            return Ok(());
        };
        Self::save(store.as_ref(), &operation.with_status(OperationStatus::Failed)).await?;

        tracing::warn!(
            "[QUEUE] Operation {} ({}) marked failed",
            id,
            operation.operation_type()
        );
        self.notify_changed(store.as_ref()).await;
        Ok(())
    }

    /// Record a failed replay.
    ///
    /// Below the cap the operation goes back to pending with one more retry;
    /// reaching the cap makes it terminally failed. Returns the updated
    /// operation, or `None` if the id is unknown.
    pub async fn increment_retry(&self, id: &str) -> Result<Option<SyncOperation>, QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        let Some(operation) = Self::load_one(store.as_ref(), id).await? else {
            return Ok(None);
        };

        let retry_count = operation.retry_count.saturating_add(1);
        let updated = if retry_count >= self.max_retry {
            tracing::warn!(
                "[QUEUE] Operation {} ({}) failed permanently after {} attempts",
                id,
                operation.operation_type(),
                retry_count
            );
            operation
                .with_retry_count(retry_count)
                .with_status(OperationStatus::Failed)
        } else {
            tracing::debug!(
                "[QUEUE] Operation {} retry {}/{}",
                id,
                retry_count,
                self.max_retry
            );
            operation
                .with_retry_count(retry_count)
                .with_status(OperationStatus::Pending)
        };

        Self::save(store.as_ref(), &updated).await?;
        self.notify_changed(store.as_ref()).await;
        Ok(Some(updated))
    }

    /// Give an operation a fresh start: pending with no retries. No-op if absent.
    pub async fn requeue(&self, id: &str) -> Result<(), QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        let Some(operation) = Self::load_one(store.as_ref(), id).await? else {
            return Ok(());
        };
        let reset = operation
            .with_retry_count(0)
            .with_status(OperationStatus::Pending);
        Self::save(store.as_ref(), &reset).await?;

        tracing::info!("[QUEUE] Requeued {}", id);
        self.notify_changed(store.as_ref()).await;
        Ok(())
    }

    /// Return every in-progress operation to pending. Used to recover claims
    /// stranded by a crash; returns how many were released.
    pub async fn release_in_progress(&self) -> Result<usize, QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        let stranded: Vec<SyncOperation> = Self::load_all(store.as_ref())
            .await?
            .into_iter()
            .filter(|op| op.status == OperationStatus::InProgress)
            .collect();

        for operation in &stranded {
            let status = if self.over_cap(operation) {
                OperationStatus::Failed
            } else {
                OperationStatus::Pending
            };
            Self::save(store.as_ref(), &operation.with_status(status)).await?;
        }

        if !stranded.is_empty() {
            tracing::info!("[QUEUE] Released {} stranded operations", stranded.len());
            self.notify_changed(store.as_ref()).await;
        }
        Ok(stranded.len())
    }

    /// Remove failed operations created more than `max_age` ago
    pub async fn cleanup_failed(&self, max_age: Duration) -> Result<usize, QueueError> {
        let store = self.store().await?;
        let _guard = self.op_lock.lock().await;

        // An unrepresentable cutoff predates every operation
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| chrono::Utc::now().checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let mut removed = 0;
        for operation in Self::load_all(store.as_ref()).await? {
            if self.status_of(&operation) == OperationStatus::Failed && operation.timestamp < cutoff {
                store.delete(&operation.id).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("[QUEUE] Removed {} expired failed operations", removed);
            self.notify_changed(store.as_ref()).await;
        }
        Ok(removed)
    }

    /// Number of pending and in-progress operations.
    ///
    /// Never fails: read errors are logged and reported as 0.
    pub async fn pending_count(&self) -> usize {
        let store = match self.store().await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("[QUEUE] pending_count unavailable: {}", e);
                return 0;
            }
        };
        self.count_pending(store.as_ref()).await
    }

    /// Operation counts by status
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let store = self.store().await?;
        let mut stats = QueueStats::default();
        for operation in Self::load_all(store.as_ref()).await? {
            stats.total += 1;
            match self.status_of(&operation) {
                OperationStatus::Pending => stats.pending += 1,
                OperationStatus::InProgress => stats.in_progress += 1,
                OperationStatus::Failed => stats.failed += 1,
                OperationStatus::Completed => {}
            }
        }
        Ok(stats)
    }

    /// Subscribe to pending-count changes
    pub async fn subscribe(&self) -> Result<QueueSubscription, QueueError> {
        self.ensure_not_disposed()?;
        self.notifier.subscribe().await.ok_or(QueueError::Disposed)
    }

    /// Close the change channel. The queue must not be used afterwards.
    pub async fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.notifier.close().await;
        tracing::debug!("[QUEUE] Disposed '{}'", self.box_name);
    }

    fn ensure_not_disposed(&self) -> Result<(), QueueError> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(QueueError::Disposed)
        } else {
            Ok(())
        }
    }

    async fn store(&self) -> Result<Arc<dyn KeyValueStore>, QueueError> {
        self.ensure_not_disposed()?;
        self.store
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(QueueError::NotInitialized)
    }

    async fn save(store: &dyn KeyValueStore, operation: &SyncOperation) -> Result<(), QueueError> {
        let record = operation.to_record().map_err(|source| QueueError::Corrupt {
            id: operation.id.clone(),
            source,
        })?;
        store.put(&operation.id, &record).await?;
        Ok(())
    }

    async fn load_one(
        store: &dyn KeyValueStore,
        id: &str,
    ) -> Result<Option<SyncOperation>, QueueError> {
        match store.get(id).await? {
            Some(record) => SyncOperation::from_record(record)
                .map(Some)
                .map_err(|source| QueueError::Corrupt {
                    id: id.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Every decodable operation; undecodable records are skipped
    async fn load_all(store: &dyn KeyValueStore) -> Result<Vec<SyncOperation>, QueueError> {
        let mut operations = Vec::new();
        for (key, record) in store.entries().await? {
            match SyncOperation::from_record(record) {
                Ok(operation) => operations.push(operation),
                Err(e) => tracing::warn!("[QUEUE] Skipping unreadable operation {}: {}", key, e),
            }
        }
        Ok(operations)
    }

    async fn count_pending(&self, store: &dyn KeyValueStore) -> usize {
        match Self::load_all(store).await {
            Ok(operations) => operations
                .iter()
                .filter(|op| self.status_of(op).is_pending())
                .count(),
            Err(e) => {
                tracing::warn!("[QUEUE] Failed to count pending operations: {}", e);
                0
            }
        }
    }

    async fn notify_changed(&self, store: &dyn KeyValueStore) {
        let count = self.count_pending(store).await;
        self.notifier.notify(count).await;
    }

    fn over_cap(&self, operation: &SyncOperation) -> bool {
        operation.retry_count >= self.max_retry
    }

    /// Stored status, except that live operations at or past the retry cap
    /// are failed. Covers records written under a higher cap.
    fn status_of(&self, operation: &SyncOperation) -> OperationStatus {
        if operation.status.is_pending() && self.over_cap(operation) {
            OperationStatus::Failed
        } else {
            operation.status
        }
    }

    fn sort_fifo(operations: &mut [SyncOperation]) {
        operations.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub total: usize,
}
