//! # Network Monitor
//!
//! Connectivity signal shared by the repository and the sync driver. The host
//! (platform connectivity callbacks, a health probe, or tests) reports status
//! changes with [`NetworkMonitor::set_status`]; watchers are woken on every
//! transition.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::Online => f.write_str("online"),
            NetworkStatus::Offline => f.write_str("offline"),
        }
    }
}

#[derive(Debug)]
pub struct NetworkMonitor {
    sender: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn get_status(&self) -> NetworkStatus {
        *self.sender.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.get_status() == NetworkStatus::Online
    }

    /// Record a new status. Watchers are only woken when it actually changes.
    pub fn set_status(&self, status: NetworkStatus) {
        let changed = self.sender.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            tracing::info!("[SYNC] Network is now {}", status);
        }
    }

    pub fn set_online(&self, online: bool) {
        self.set_status(if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        });
    }

    /// Watch status transitions
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.sender.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::Offline)
    }
}
