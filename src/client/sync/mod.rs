//! # Background Sync Service
//!
//! Drains the offline sync queue against the remote API whenever the device is
//! online.
//!
//! ## Architecture
//!
//! - **Drain**: claims queued operations oldest first and replays them one at a
//!   time. Success removes the operation; a failure either counts a retry and
//!   stops the drain (later operations must not overtake it) or, once the
//!   retry cap is reached or the server rejects the request outright, marks
//!   the operation failed and moves on.
//! - **Background task**: drains when connectivity returns, on every sync
//!   interval tick and whenever the queue changes. Blocked drains are retried
//!   after the backoff delay of the retry policy.
//! - **Network Monitor**: connectivity signal supplied by the host
//! - **Sync State / Metrics**: status snapshot and counters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fitsync::client::sync::{NetworkMonitor, NetworkStatus, SyncConfig, SyncService};
//! # use fitsync::client::offline::SyncQueue;
//! # use fitsync::client::api::RemoteApi;
//! # use std::sync::Arc;
//!
//! # async fn example(queue: Arc<SyncQueue>, api: Arc<dyn RemoteApi>) -> Result<(), fitsync::client::sync::SyncError> {
//! let network = Arc::new(NetworkMonitor::new(NetworkStatus::Online));
//! let mut sync_service = SyncService::new(queue, api, network, SyncConfig::default());
//!
//! // Start background sync
//! sync_service.start().await?;
//!
//! // Force immediate sync
//! let report = sync_service.drain().await?;
//! println!("replayed {} operations", report.replayed);
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod network_monitor;
pub mod replay;
pub mod sync_state;

pub use metrics::SyncMetrics;
pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use replay::replay_operation;
pub use sync_state::SyncState;

use crate::client::api::RemoteApi;
use crate::client::offline::{OperationStatus, QueueError, QueueSubscription, RetryPolicy, SyncQueue};
use crate::shared::config::{AppConfig, DEFAULT_SYNC_INTERVAL_SECS};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Configuration for the sync service
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between periodic drains while online
    pub sync_interval: Duration,
    /// Backoff after a blocked drain
    pub retry_policy: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            sync_interval: app.sync_interval(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync service is already running")]
    AlreadyRunning,

    #[error("sync queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Outcome of one drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Operations replayed and removed
    pub replayed: usize,
    /// Operations that failed and went back to pending
    pub retried: usize,
    /// Operations that became terminally failed
    pub permanently_failed: usize,
    /// The drain stopped at an operation that will be retried
    pub blocked: bool,
    /// Another drain was already running
    pub skipped: bool,
}

impl DrainReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Main sync service coordinator
#[derive(Debug)]
pub struct SyncService {
    inner: Arc<SyncInner>,
    /// Background sync task handle
    background_task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct SyncInner {
    queue: Arc<SyncQueue>,
    api: Arc<dyn RemoteApi>,
    network: Arc<NetworkMonitor>,
    config: SyncConfig,
    /// Held for the duration of a drain
    drain_lock: Mutex<()>,
    state: RwLock<SyncState>,
    metrics: RwLock<SyncMetrics>,
}

impl SyncService {
    pub fn new(
        queue: Arc<SyncQueue>,
        api: Arc<dyn RemoteApi>,
        network: Arc<NetworkMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                queue,
                api,
                network,
                config,
                drain_lock: Mutex::new(()),
                state: RwLock::new(SyncState::default()),
                metrics: RwLock::new(SyncMetrics::new()),
            }),
            background_task: None,
        }
    }

    /// Release operations stranded in progress by an earlier run and start
    /// the background task
    pub async fn start(&mut self) -> Result<(), SyncError> {
        if self.background_task.is_some() {
            return Err(SyncError::AlreadyRunning);
        }

        let released = self.inner.queue.release_in_progress().await?;
        if released > 0 {
            tracing::info!("[SYNC] Recovered {} interrupted operations", released);
        }

        let inner = Arc::clone(&self.inner);
        self.background_task = Some(tokio::spawn(async move {
            inner.background_sync_loop().await;
        }));
        tracing::info!(
            "[SYNC] Background sync started (interval {:?})",
            self.inner.config.sync_interval
        );
        Ok(())
    }

    /// Stop the background sync task
    pub fn stop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
            tracing::info!("[SYNC] Background sync stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.background_task
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drain the queue now. Returns immediately if a drain is in flight.
    pub async fn drain(&self) -> Result<DrainReport, SyncError> {
        self.inner.drain().await
    }

    /// Get current sync status
    pub async fn status(&self) -> SyncState {
        let mut state = self.inner.state.read().await.clone();
        state.network_status = self.inner.network.get_status();
        state.pending_operations = self.inner.queue.pending_count().await;
        match self.inner.queue.stats().await {
            Ok(stats) => state.failed_operations = stats.failed,
            Err(e) => tracing::debug!("[SYNC] Queue stats unavailable: {}", e),
        }
        state
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.inner.metrics.read().await.clone()
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
        }
    }
}

impl SyncInner {
    async fn drain(&self) -> Result<DrainReport, SyncError> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            tracing::debug!("[SYNC] Drain already in progress, skipping");
            return Ok(DrainReport::skipped());
        };

        let started = self.metrics.write().await.record_drain_start();
        self.state.write().await.is_syncing = true;

        let mut report = DrainReport::default();
        let result = self.replay_pending(&mut report).await;

        let mut state = self.state.write().await;
        state.is_syncing = false;
        match &result {
            Ok(()) => {
                self.metrics
                    .write()
                    .await
                    .record_drain_finished(started, report.blocked);
                if !report.blocked {
                    state.last_sync = Some(chrono::Utc::now());
                }
                tracing::debug!("[SYNC] Drain finished: {:?}", report);
            }
            Err(e) => {
                self.metrics.write().await.record_drain_failure();
                state.last_error = Some(e.to_string());
                tracing::error!("[SYNC] Drain failed: {}", e);
            }
        }

        result.map(|()| report)
    }

    /// Replay operations oldest first while online
    async fn replay_pending(&self, report: &mut DrainReport) -> Result<(), SyncError> {
        while self.network.is_online() {
            let Some(operation) = self.queue.dequeue().await? else {
                break;
            };

            let error = match replay_operation(self.api.as_ref(), &operation).await {
                Ok(()) => {
                    self.queue.mark_completed(&operation.id).await?;
                    self.metrics.write().await.record_replayed();
                    report.replayed += 1;
                    continue;
                }
                Err(e) => e,
            };
            self.state.write().await.last_error = Some(error.to_string());

            if !error.is_retryable() {
                tracing::warn!(
                    "[SYNC] Server rejected {} ({}): {}",
                    operation.id,
                    operation.operation_type(),
                    error
                );
                self.queue.mark_failed(&operation.id).await?;
                self.metrics.write().await.record_failed();
                report.permanently_failed += 1;
                continue;
            }

            match self.queue.increment_retry(&operation.id).await? {
                Some(updated) if updated.status == OperationStatus::Failed => {
                    self.metrics.write().await.record_failed();
                    report.permanently_failed += 1;
                }
                Some(updated) => {
                    tracing::debug!(
                        "[SYNC] Replay of {} failed ({}), retry {} scheduled",
                        updated.id,
                        error,
                        updated.retry_count
                    );
                    self.metrics.write().await.record_retried();
                    report.retried += 1;
                    report.blocked = true;
                    break;
                }
                None => {}
            }
        }
        Ok(())
    }

    async fn background_sync_loop(&self) {
        let mut network_rx = self.network.subscribe();
        let mut queue_rx: Option<QueueSubscription> = match self.queue.subscribe().await {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                tracing::warn!("[SYNC] Queue notifications unavailable: {}", e);
                None
            }
        };

        let mut interval = tokio::time::interval(self.config.sync_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut blocked_attempts: u32 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = network_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                count = next_notification(&mut queue_rx) => {
                    match count {
                        Some(0) => continue,
                        Some(_) => {}
                        None => {
                            tracing::info!("[SYNC] Queue closed, stopping background sync");
                            break;
                        }
                    }
                }
            }

            // Drain until the queue settles or a blocked drain has to wait
            while self.network.is_online() {
                match self.drain().await {
                    Ok(report) if report.skipped => break,
                    Ok(report) if report.blocked => {
                        blocked_attempts = blocked_attempts.saturating_add(1);
                        let delay = self.config.retry_policy.delay_for(blocked_attempts);
                        tracing::debug!("[SYNC] Drain blocked, retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                    Ok(_) => {
                        blocked_attempts = 0;
                        // Writes that landed after the last claim
                        let newer = queue_rx
                            .as_mut()
                            .and_then(QueueSubscription::try_latest)
                            .is_some_and(|count| count > 0);
                        if !newer {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
    }
}

/// Next queue notification; pends forever without a subscription
async fn next_notification(subscription: &mut Option<QueueSubscription>) -> Option<usize> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}
