//! In-process `RemoteApi` for unit tests.

use super::{ApiError, RemoteApi};
use crate::shared::models::{DailyStats, Goal, StepRecord, UserProfile, WeeklyTrend};
use async_trait::async_trait;
use std::sync::Mutex;

/// Echoes writes back, serves whatever was seeded for reads, and can be told
/// to fail.
#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    failure: Mutex<Option<ApiError>>,
    /// Calls that fail before `failure` stops applying; `None` means always
    failures_left: Mutex<Option<u32>>,
    calls: Mutex<Vec<String>>,
    pub today: Mutex<Option<DailyStats>>,
    pub trend: Mutex<Option<WeeklyTrend>>,
    pub goals: Mutex<Vec<Goal>>,
    pub profile: Mutex<Option<UserProfile>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call with `error` until cleared
    pub fn fail_with(&self, error: ApiError) {
        *self.failure.lock().unwrap() = Some(error);
        *self.failures_left.lock().unwrap() = None;
    }

    /// Fail the next `times` calls with `error`
    pub fn fail_times(&self, times: u32, error: ApiError) {
        *self.failure.lock().unwrap() = Some(error);
        *self.failures_left.lock().unwrap() = Some(times);
    }

    pub fn go_offline(&self) {
        self.fail_with(ApiError::Network("connection refused".to_string()));
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Names of the calls made so far, e.g. `create_step:<id>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, name: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(name);

        let mut failure = self.failure.lock().unwrap();
        let Some(error) = failure.clone() else {
            return Ok(());
        };
        let mut left = self.failures_left.lock().unwrap();
        match left.as_mut() {
            None => Err(error),
            Some(0) => {
                *failure = None;
                Ok(())
            }
            Some(n) => {
                *n -= 1;
                if *n == 0 {
                    *failure = None;
                }
                Err(error)
            }
        }
    }

    fn not_found() -> ApiError {
        ApiError::Server {
            status: 404,
            message: "not found".to_string(),
        }
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn fetch_today_stats(&self) -> Result<DailyStats, ApiError> {
        self.call("fetch_today_stats".to_string())?;
        self.today.lock().unwrap().clone().ok_or_else(Self::not_found)
    }

    async fn fetch_weekly_trend(&self) -> Result<WeeklyTrend, ApiError> {
        self.call("fetch_weekly_trend".to_string())?;
        self.trend.lock().unwrap().clone().ok_or_else(Self::not_found)
    }

    async fn fetch_goals(&self) -> Result<Vec<Goal>, ApiError> {
        self.call("fetch_goals".to_string())?;
        Ok(self.goals.lock().unwrap().clone())
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.call("fetch_profile".to_string())?;
        self.profile.lock().unwrap().clone().ok_or_else(Self::not_found)
    }

    async fn create_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError> {
        self.call(format!("create_step:{}", record.id))?;
        Ok(record.clone())
    }

    async fn update_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError> {
        self.call(format!("update_step:{}", record.id))?;
        Ok(record.clone())
    }

    async fn create_goal(&self, goal: &Goal) -> Result<Goal, ApiError> {
        self.call(format!("create_goal:{}", goal.id))?;
        self.goals.lock().unwrap().push(goal.clone());
        Ok(goal.clone())
    }

    async fn update_goal(&self, goal: &Goal) -> Result<Goal, ApiError> {
        self.call(format!("update_goal:{}", goal.id))?;
        let mut goals = self.goals.lock().unwrap();
        match goals.iter_mut().find(|g| g.id == goal.id) {
            Some(existing) => *existing = goal.clone(),
            None => goals.push(goal.clone()),
        }
        Ok(goal.clone())
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ApiError> {
        self.call(format!("update_profile:{}", profile.id))?;
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(profile.clone())
    }
}
