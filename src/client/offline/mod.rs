//! # Offline Sync Queue
//!
//! Mutations that could not reach the server are wrapped as sync operations
//! and persisted here until the sync driver replays them.
//!
//! ## Key Components
//!
//! - `operation.rs`: `SyncOperation`, its typed payload and on-disk record
//! - `queue.rs`: the durable FIFO `SyncQueue`
//! - `notifier.rs`: pending-count change notifications
//! - `retry.rs`: backoff between blocked drains

pub mod notifier;
pub mod operation;
pub mod queue;
pub mod retry;

// Re-export main types
pub use notifier::{QueueNotifier, QueueSubscription};
pub use operation::{
    OperationPayload, OperationStatus, RecordError, SyncOperation, SyncOperationType,
};
pub use queue::{QueueError, QueueStats, SyncQueue};
pub use retry::{BackoffStrategy, RetryPolicy};
