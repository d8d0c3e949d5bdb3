//! # Sync State
//!
//! Snapshot of the sync driver for status displays.

use super::network_monitor::NetworkStatus;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub is_syncing: bool,
    /// End of the last drain that emptied the queue
    pub last_sync: Option<DateTime<Utc>>,
    pub pending_operations: usize,
    pub failed_operations: usize,
    pub network_status: NetworkStatus,
    pub last_error: Option<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            is_syncing: false,
            last_sync: None,
            pending_operations: 0,
            failed_operations: 0,
            network_status: NetworkStatus::Offline,
            last_error: None,
        }
    }
}
