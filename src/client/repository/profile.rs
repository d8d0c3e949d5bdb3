use super::{Fresh, OfflineFirstRepository, RepositoryError, WriteOutcome, PROFILE_KEY};
use crate::client::offline::OperationPayload;
use crate::shared::models::UserProfile;

impl OfflineFirstRepository {
    pub async fn profile(&self) -> Result<Fresh<UserProfile>, RepositoryError> {
        self.read_through(PROFILE_KEY, self.api.fetch_profile()).await
    }

    /// Save the profile; the cached copy always reflects the latest edit
    pub async fn update_profile(
        &self,
        profile: UserProfile,
    ) -> Result<WriteOutcome<UserProfile>, RepositoryError> {
        let outcome = self
            .write_or_enqueue(
                self.api.update_profile(&profile),
                OperationPayload::UpdateProfile(profile.clone()),
                profile.clone(),
            )
            .await?;
        self.update_cache(PROFILE_KEY, self.cache.put(PROFILE_KEY, outcome.value()))
            .await;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use super::super::DataSource;
    use super::*;
    use crate::client::offline::SyncOperationType;

    #[tokio::test]
    async fn test_profile_read_through() {
        let h = harness().await;
        let profile = UserProfile::new("u1", "Sam", 8_000);
        *h.api.profile.lock().unwrap() = Some(profile.clone());

        let fresh = h.repo.profile().await.unwrap();
        assert_eq!(fresh.source, DataSource::Remote);
        assert_eq!(fresh.into_inner(), profile);
    }

    #[tokio::test]
    async fn test_update_profile_offline_overwrites_cache_and_queues() {
        let h = harness().await;
        h.api.go_offline();

        let mut profile = UserProfile::new("u1", "Sam", 8_000);
        profile.weight_kg = Some(71.5);
        let outcome = h.repo.update_profile(profile.clone()).await.unwrap();
        assert!(outcome.is_queued());

        let cached = h.repo.profile().await.unwrap();
        assert!(cached.is_stale());
        assert_eq!(cached.value, profile);

        let pending = h.queue.get_pending_operations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation_type(), SyncOperationType::UpdateProfile);
    }

    #[tokio::test]
    async fn test_update_profile_online_is_synced() {
        let h = harness().await;
        let profile = UserProfile::new("u1", "Sam", 9_000);

        let outcome = h.repo.update_profile(profile.clone()).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Synced(profile.clone()));
        assert_eq!(h.api.calls(), vec!["update_profile:u1".to_string()]);
        assert_eq!(h.queue.pending_count().await, 0);
    }
}
