use super::{Fresh, OfflineFirstRepository, RepositoryError, WriteOutcome, GOALS_KEY};
use crate::client::local_db::StoreError;
use crate::client::offline::OperationPayload;
use crate::shared::models::Goal;

impl OfflineFirstRepository {
    pub async fn goals(&self) -> Result<Fresh<Vec<Goal>>, RepositoryError> {
        self.read_through(GOALS_KEY, self.api.fetch_goals()).await
    }

    pub async fn create_goal(&self, goal: Goal) -> Result<WriteOutcome<Goal>, RepositoryError> {
        let outcome = self
            .write_or_enqueue(
                self.api.create_goal(&goal),
                OperationPayload::CreateGoal(goal.clone()),
                goal.clone(),
            )
            .await?;
        self.update_cache(GOALS_KEY, self.upsert_cached_goal(outcome.value()))
            .await;
        Ok(outcome)
    }

    pub async fn update_goal(&self, goal: Goal) -> Result<WriteOutcome<Goal>, RepositoryError> {
        let outcome = self
            .write_or_enqueue(
                self.api.update_goal(&goal),
                OperationPayload::UpdateGoal(goal.clone()),
                goal.clone(),
            )
            .await?;
        self.update_cache(GOALS_KEY, self.upsert_cached_goal(outcome.value()))
            .await;
        Ok(outcome)
    }

    /// Share a locally known goal with another user
    pub async fn share_goal(
        &self,
        goal_id: &str,
        with_user: &str,
    ) -> Result<WriteOutcome<Goal>, RepositoryError> {
        let mut goal = self
            .cache
            .get::<Vec<Goal>>(GOALS_KEY)
            .await?
            .and_then(|cached| cached.value.into_iter().find(|g| g.id == goal_id))
            .ok_or(RepositoryError::NoDataAvailable { resource: "goal" })?;

        if !goal.share_with(with_user) {
            tracing::debug!("[REPO] Goal {} already shared with {}", goal_id, with_user);
        }
        self.update_goal(goal).await
    }

    async fn upsert_cached_goal(&self, goal: &Goal) -> Result<(), StoreError> {
        let mut goals = self
            .cache
            .get::<Vec<Goal>>(GOALS_KEY)
            .await?
            .map(|cached| cached.value)
            .unwrap_or_default();

        match goals.iter_mut().find(|g| g.id == goal.id) {
            Some(existing) => *existing = goal.clone(),
            None => goals.push(goal.clone()),
        }
        self.cache.put(GOALS_KEY, &goals).await
    }
}
