//! Model, operation and database fixtures

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fitsync::client::local_db::LocalDatabase;
use fitsync::client::offline::{OperationPayload, SyncOperation, SyncQueue};
use fitsync::shared::{DailyStats, Goal, GoalPeriod, StepRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

pub fn at_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub fn steps(count: u32) -> StepRecord {
    StepRecord::new(day(), count)
}

pub fn daily_stats(count: u32) -> DailyStats {
    DailyStats {
        date: day(),
        steps: count,
        distance_km: count as f64 * 0.0008,
        calories: count as f64 * 0.04,
        goal_steps: Some(10_000),
    }
}

pub fn goal(title: &str) -> Goal {
    Goal::new(title, 10_000, GoalPeriod::Daily)
}

/// A `createStep` operation with a fixed id and timestamp
pub fn step_operation(id: &str, millis: i64) -> SyncOperation {
    SyncOperation::new(id, OperationPayload::CreateStep(steps(1_000)), at_millis(millis))
}

/// A temporary directory holding a database file path
pub struct TempDatabase {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TempDatabase {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fitsync").join("local.db");
        Self { dir, path }
    }

    pub async fn open(&self) -> Arc<LocalDatabase> {
        open_database(&self.path).await
    }
}

pub async fn open_database(path: &Path) -> Arc<LocalDatabase> {
    Arc::new(
        LocalDatabase::open(path)
            .await
            .expect("Failed to open test database"),
    )
}

/// An initialized queue over `db`
pub async fn open_queue(db: &Arc<LocalDatabase>) -> Arc<SyncQueue> {
    let queue = Arc::new(SyncQueue::new(db.clone()));
    queue
        .initialize()
        .await
        .expect("Failed to initialize queue");
    queue
}
