//! Scriptable in-process remote API
//!
//! Holds server-side state in memory. Calls can be made to fail wholesale
//! (`set_offline`), one by one (`push_failure`), or slowly (`set_delay`).

use async_trait::async_trait;
use fitsync::client::api::{ApiError, RemoteApi};
use fitsync::shared::{DailyStats, Goal, StepRecord, UserProfile, WeeklyTrend};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ScriptedApi {
    offline: AtomicBool,
    failures: Mutex<VecDeque<ApiError>>,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
    pub today: Mutex<Option<DailyStats>>,
    pub trend: Mutex<Option<WeeklyTrend>>,
    pub steps: Mutex<Vec<StepRecord>>,
    pub goals: Mutex<Vec<Goal>>,
    pub profile: Mutex<Option<UserProfile>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fail the next call with `error`
    pub fn push_failure(&self, error: ApiError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Delay every call by `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Calls that reached the server, e.g. `create_step:<id>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the write calls, in order
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !call.starts_with("fetch_"))
            .collect()
    }

    async fn call(&self, name: String) -> Result<(), ApiError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }
        self.calls.lock().unwrap().push(name);
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn missing(resource: &str) -> ApiError {
        ApiError::Server {
            status: 404,
            message: format!("no {}", resource),
        }
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn fetch_today_stats(&self) -> Result<DailyStats, ApiError> {
        self.call("fetch_today_stats".to_string()).await?;
        self.today
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Self::missing("stats"))
    }

    async fn fetch_weekly_trend(&self) -> Result<WeeklyTrend, ApiError> {
        self.call("fetch_weekly_trend".to_string()).await?;
        self.trend
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Self::missing("trend"))
    }

    async fn fetch_goals(&self) -> Result<Vec<Goal>, ApiError> {
        self.call("fetch_goals".to_string()).await?;
        Ok(self.goals.lock().unwrap().clone())
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.call("fetch_profile".to_string()).await?;
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Self::missing("profile"))
    }

    async fn create_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError> {
        self.call(format!("create_step:{}", record.id)).await?;
        self.steps.lock().unwrap().push(record.clone());
        Ok(record.clone())
    }

    async fn update_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError> {
        self.call(format!("update_step:{}", record.id)).await?;
        let mut steps = self.steps.lock().unwrap();
        match steps.iter_mut().find(|s| s.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => return Err(Self::missing("step record")),
        }
        Ok(record.clone())
    }

    async fn create_goal(&self, goal: &Goal) -> Result<Goal, ApiError> {
        self.call(format!("create_goal:{}", goal.id)).await?;
        self.goals.lock().unwrap().push(goal.clone());
        Ok(goal.clone())
    }

    async fn update_goal(&self, goal: &Goal) -> Result<Goal, ApiError> {
        self.call(format!("update_goal:{}", goal.id)).await?;
        let mut goals = self.goals.lock().unwrap();
        match goals.iter_mut().find(|g| g.id == goal.id) {
            Some(existing) => *existing = goal.clone(),
            None => return Err(Self::missing("goal")),
        }
        Ok(goal.clone())
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ApiError> {
        self.call(format!("update_profile:{}", profile.id)).await?;
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(profile.clone())
    }
}
