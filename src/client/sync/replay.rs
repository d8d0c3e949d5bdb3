//! Replay of queued operations against the remote API.

use crate::client::api::{ApiError, RemoteApi};
use crate::client::offline::{OperationPayload, SyncOperation};

/// Send `operation` to the matching remote call. The server's response is
/// discarded; the next read refreshes the cache.
pub async fn replay_operation(
    api: &dyn RemoteApi,
    operation: &SyncOperation,
) -> Result<(), ApiError> {
    tracing::debug!(
        "[SYNC] Replaying {} ({}), attempt {}",
        operation.id,
        operation.operation_type(),
        operation.attempt()
    );

    match &operation.payload {
        OperationPayload::CreateStep(record) => api.create_step(record).await.map(drop),
        OperationPayload::UpdateStep(record) => api.update_step(record).await.map(drop),
        OperationPayload::CreateGoal(goal) => api.create_goal(goal).await.map(drop),
        OperationPayload::UpdateGoal(goal) => api.update_goal(goal).await.map(drop),
        OperationPayload::UpdateProfile(profile) => api.update_profile(profile).await.map(drop),
    }
}
