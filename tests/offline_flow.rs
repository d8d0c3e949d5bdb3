//! End-to-end offline flows over an on-disk database

#[macro_use]
mod common;

use common::*;
use fitsync::client::api::ApiError;
use fitsync::client::local_db::StoreError;
use fitsync::client::offline::{OperationStatus, SyncOperationType};
use fitsync::client::repository::{OfflineFirstRepository, RepositoryError, WriteOutcome};
use fitsync::client::sync::{NetworkMonitor, NetworkStatus, SyncConfig, SyncService};
use fitsync::shared::UserProfile;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct App {
    api: Arc<ScriptedApi>,
    repo: OfflineFirstRepository,
    service: SyncService,
    queue: Arc<fitsync::client::offline::SyncQueue>,
    network: Arc<NetworkMonitor>,
}

async fn app(db: &Arc<fitsync::client::local_db::LocalDatabase>, api: Arc<ScriptedApi>) -> App {
    let queue = open_queue(db).await;
    let network = Arc::new(NetworkMonitor::new(NetworkStatus::Online));
    let repo = assert_ok!(OfflineFirstRepository::open(api.clone(), db.as_ref(), queue.clone()).await);
    let service = SyncService::new(queue.clone(), api.clone(), network.clone(), SyncConfig::default());
    App {
        api,
        repo,
        service,
        queue,
        network,
    }
}

#[tokio::test]
async fn queued_operations_survive_restart() {
    let temp = TempDatabase::new();

    {
        let db = temp.open().await;
        let queue = open_queue(&db).await;
        assert_ok!(queue.enqueue(step_operation("first", 10)).await);
        assert_ok!(queue.enqueue(step_operation("second", 10)).await);
        assert_ok!(queue.enqueue(step_operation("third", 5)).await);
        queue.dispose().await;
        db.close().await;
    }

    let db = temp.open().await;
    let queue = open_queue(&db).await;
    let pending = assert_ok!(queue.get_pending_operations().await);
    assert_operation_ids!(pending, ["third", "first", "second"]);

    // New operations keep sorting after the recovered ones on equal timestamps
    assert_ok!(queue.enqueue(step_operation("fourth", 10)).await);
    let pending = assert_ok!(queue.get_pending_operations().await);
    assert_operation_ids!(pending, ["third", "first", "second", "fourth"]);
}

#[tokio::test]
async fn second_process_cannot_open_the_same_database() {
    let temp = TempDatabase::new();
    let _owner = temp.open().await;

    let second = fitsync::client::local_db::LocalDatabase::open(&temp.path).await;
    assert_err!(second, StoreError::Locked(_));
}

#[tokio::test]
async fn offline_writes_replay_in_order_after_reconnect() {
    let temp = TempDatabase::new();
    let db = temp.open().await;
    let api = Arc::new(ScriptedApi::new());
    let app = app(&db, api).await;

    app.api.set_offline(true);
    let record = steps(3_200);
    let goal = goal("Morning walk");
    let profile = UserProfile::new("user-1", "Robin", 9_000);

    let first = assert_ok!(app.repo.record_steps(record.clone()).await);
    let second = assert_ok!(app.repo.create_goal(goal.clone()).await);
    let third = assert_ok!(app.repo.update_profile(profile.clone()).await);
    assert!(first.is_queued() && second.is_queued() && third.is_queued());

    let pending = assert_ok!(app.queue.get_pending_operations().await);
    let types: Vec<SyncOperationType> = pending.iter().map(|op| op.operation_type()).collect();
    assert_eq!(
        types,
        vec![
            SyncOperationType::CreateStep,
            SyncOperationType::CreateGoal,
            SyncOperationType::UpdateProfile,
        ]
    );

    // Optimistic values are readable while offline
    let cached_goals = assert_ok!(app.repo.goals().await);
    assert!(cached_goals.is_stale());
    assert_eq!(cached_goals.value, vec![goal.clone()]);

    app.api.set_offline(false);
    let report = assert_ok!(app.service.drain().await);
    assert_eq!(report.replayed, 3);
    assert_eq!(app.queue.pending_count().await, 0);

    assert_eq!(
        app.api.writes(),
        vec![
            format!("create_step:{}", record.id),
            format!("create_goal:{}", goal.id),
            "update_profile:user-1".to_string(),
        ]
    );
    assert_eq!(app.api.profile.lock().unwrap().clone(), Some(profile));
}

#[tokio::test]
async fn failing_replay_keeps_later_operations_waiting() {
    let temp = TempDatabase::new();
    let db = temp.open().await;
    let app = app(&db, Arc::new(ScriptedApi::new())).await;

    app.api.set_offline(true);
    let first = assert_ok!(app.repo.record_steps(steps(100)).await);
    assert_ok!(app.repo.record_steps(steps(200)).await);
    app.api.set_offline(false);

    app.api.push_failure(ApiError::Server {
        status: 502,
        message: "bad gateway".to_string(),
    });
    let report = assert_ok!(app.service.drain().await);
    assert!(report.blocked);
    assert_eq!(report.replayed, 0);

    let first_id = first.operation_id().unwrap();
    let stored = assert_ok!(app.queue.get_operation(first_id).await).unwrap();
    assert_eq!(stored.retry_count, 1);
    assert_eq!(stored.status, OperationStatus::Pending);
    assert_eq!(app.queue.pending_count().await, 2);

    let report = assert_ok!(app.service.drain().await);
    assert_eq!(report.replayed, 2);
}

#[tokio::test]
async fn operation_fails_permanently_after_max_retries() {
    let temp = TempDatabase::new();
    let db = temp.open().await;
    let app = app(&db, Arc::new(ScriptedApi::new())).await;

    app.api.set_offline(true);
    let outcome = assert_ok!(app.repo.record_steps(steps(100)).await);
    let id = outcome.operation_id().unwrap().to_string();

    for _ in 0..5 {
        assert_ok!(app.service.drain().await);
    }

    let failed = assert_ok!(app.queue.get_failed_operations().await);
    assert_operation_ids!(failed, [id.as_str()]);
    assert_eq!(failed[0].retry_count, 5);

    let status = app.service.status().await;
    assert_eq!(status.failed_operations, 1);
    assert_eq!(status.pending_operations, 0);
    assert_contains!(status.last_error.unwrap(), "Network error");

    assert_ok!(app.queue.requeue(&id).await);
    app.api.set_offline(false);
    let report = assert_ok!(app.service.drain().await);
    assert_eq!(report.replayed, 1);
}

#[tokio::test]
async fn concurrent_drains_are_serialized() {
    let temp = TempDatabase::new();
    let db = temp.open().await;
    let app = app(&db, Arc::new(ScriptedApi::new())).await;

    assert_ok!(app.queue.enqueue(step_operation("slow", 1)).await);
    app.api.set_delay(Duration::from_millis(200));

    let (a, b) = tokio::join!(app.service.drain(), app.service.drain());
    let (a, b) = (assert_ok!(a), assert_ok!(b));

    assert!(a.skipped != b.skipped, "exactly one drain should be skipped");
    assert_eq!(a.replayed + b.replayed, 1);
    assert_eq!(app.api.writes().len(), 1);
}

#[tokio::test]
async fn interrupted_claims_are_recovered_on_start() {
    let temp = TempDatabase::new();

    {
        let db = temp.open().await;
        let queue = open_queue(&db).await;
        assert_ok!(queue.enqueue(step_operation("claimed", 1)).await);
        let claimed = assert_ok!(queue.dequeue().await).unwrap();
        assert_eq!(claimed.status, OperationStatus::InProgress);
        // Simulated crash: the claim is never resolved
        db.close().await;
    }

    let db = temp.open().await;
    let mut app = app(&db, Arc::new(ScriptedApi::new())).await;
    app.network.set_status(NetworkStatus::Offline);
    assert_ok!(app.service.start().await);

    let op = assert_ok!(app.queue.get_operation("claimed").await).unwrap();
    assert_eq!(op.status, OperationStatus::Pending);

    app.network.set_online(true);
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while app.queue.pending_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "queue should drain after reconnect");
    app.service.stop();
}

#[tokio::test]
async fn reads_fall_back_to_cache_across_restart() {
    let temp = TempDatabase::new();
    let api = Arc::new(ScriptedApi::new());
    *api.today.lock().unwrap() = Some(daily_stats(6_400));

    {
        let db = temp.open().await;
        let app = app(&db, api.clone()).await;
        let fresh = assert_ok!(app.repo.today_stats().await);
        assert!(!fresh.is_stale());
        db.close().await;
    }

    api.set_offline(true);
    let db = temp.open().await;
    let app = app(&db, api).await;

    let cached = assert_ok!(app.repo.today_stats().await);
    assert!(cached.is_stale());
    assert_eq!(cached.value, daily_stats(6_400));

    assert_err!(
        app.repo.weekly_trend().await,
        RepositoryError::NoDataAvailable { resource: "weekly_trend" }
    );
}

#[tokio::test]
async fn successful_write_is_not_queued() {
    let temp = TempDatabase::new();
    let db = temp.open().await;
    let app = app(&db, Arc::new(ScriptedApi::new())).await;

    let record = steps(500);
    let outcome = assert_ok!(app.repo.record_steps(record.clone()).await);
    assert_eq!(outcome, WriteOutcome::Synced(record));
    assert_eq!(app.queue.pending_count().await, 0);
    assert_eq!(assert_ok!(db.get_stats().await).queued_operations, 0);
}
