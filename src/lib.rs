//! FitSync - Offline Sync Core
//!
//! Offline-first data layer for a fitness tracking client. Reads and writes go
//! to the fitness API when it is reachable; otherwise reads are served from a
//! local cache and writes are persisted in a durable queue that is replayed
//! in order once connectivity returns.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by every layer
//!   - Fitness models (steps, goals, profile)
//!   - Application configuration
//!
//! - **`client`** - The device-side sync core
//!   - SQLite key-value storage and resource cache
//!   - Sync operations and the durable sync queue
//!   - Remote API contract and HTTP client
//!   - Offline-first repository
//!   - Background sync service
//!
//! # Feature Flags
//!
//! - **`daemon`** - builds the `fitsync-sync` binary (log subscriber, `.env`
//!   loading)
//!
//! # Thread Safety
//!
//! The queue, repository and sync service are `Send + Sync` and meant to be
//! shared behind `Arc`. Queue mutations are serialized internally; at most one
//! drain runs at a time.
//!
//! # Error Handling
//!
//! Each layer has its own `thiserror` enum (`StoreError`, `RecordError`,
//! `QueueError`, `ApiError`, `RepositoryError`, `SyncError`), converted with `?` at layer
//! boundaries.

/// Shared types and data structures
pub mod shared;

/// Device-side sync core
pub mod client;
