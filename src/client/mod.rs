//! # Client Sync Core
//!
//! Everything the device side needs to keep working without a connection.
//!
//! ## Architecture
//!
//! - **Local DB**: SQLite-backed key-value boxes (`local_db`)
//! - **Offline Queue**: durable FIFO of deferred writes (`offline`)
//! - **Remote API**: the server contract and its HTTP client (`api`)
//! - **Repository**: remote-first reads and writes with cache fallback and
//!   queueing (`repository`)
//! - **Sync**: background replay of the queue (`sync`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fitsync::client::api::HttpApiClient;
//! use fitsync::client::config::Config;
//! use fitsync::client::local_db::LocalDatabase;
//! use fitsync::client::offline::SyncQueue;
//! use fitsync::client::repository::OfflineFirstRepository;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new();
//! let db = Arc::new(LocalDatabase::open(config.database_path()).await?);
//!
//! let queue = Arc::new(SyncQueue::new(db.clone()));
//! queue.initialize().await?;
//!
//! let api = Arc::new(HttpApiClient::new(config)?);
//! let repo = OfflineFirstRepository::open(api, db.as_ref(), queue).await?;
//! let today = repo.today_stats().await?;
//! println!("{} steps today", today.value.steps);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod local_db;
pub mod offline;
pub mod repository;
pub mod sync;

pub use config::Config;
