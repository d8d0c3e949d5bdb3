use super::{
    Fresh, OfflineFirstRepository, RepositoryError, WriteOutcome, TODAY_STATS_KEY,
    WEEKLY_TREND_KEY,
};
use crate::client::offline::OperationPayload;
use crate::shared::models::{DailyStats, StepRecord, WeeklyTrend};

impl OfflineFirstRepository {
    pub async fn today_stats(&self) -> Result<Fresh<DailyStats>, RepositoryError> {
        self.read_through(TODAY_STATS_KEY, self.api.fetch_today_stats())
            .await
    }

    pub async fn weekly_trend(&self) -> Result<Fresh<WeeklyTrend>, RepositoryError> {
        self.read_through(WEEKLY_TREND_KEY, self.api.fetch_weekly_trend())
            .await
    }

    /// Record a new step count
    pub async fn record_steps(
        &self,
        record: StepRecord,
    ) -> Result<WriteOutcome<StepRecord>, RepositoryError> {
        let outcome = self
            .write_or_enqueue(
                self.api.create_step(&record),
                OperationPayload::CreateStep(record.clone()),
                record.clone(),
            )
            .await?;
        self.after_step_write(&outcome).await;
        Ok(outcome)
    }

    /// Correct an existing step record
    pub async fn update_steps(
        &self,
        record: StepRecord,
    ) -> Result<WriteOutcome<StepRecord>, RepositoryError> {
        let outcome = self
            .write_or_enqueue(
                self.api.update_step(&record),
                OperationPayload::UpdateStep(record.clone()),
                record.clone(),
            )
            .await?;
        self.after_step_write(&outcome).await;
        Ok(outcome)
    }

    /// Server-side aggregates are stale once a step write lands; queued
    /// writes leave the last known aggregates in place.
    async fn after_step_write(&self, outcome: &WriteOutcome<StepRecord>) {
        if outcome.is_queued() {
            return;
        }
        self.update_cache(TODAY_STATS_KEY, self.cache.invalidate(TODAY_STATS_KEY))
            .await;
        self.update_cache(WEEKLY_TREND_KEY, self.cache.invalidate(WEEKLY_TREND_KEY))
            .await;
    }
}
