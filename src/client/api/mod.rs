//! # Remote API
//!
//! The server-side collaborator of the offline-first repository and the sync
//! driver. [`RemoteApi`] is object safe so both can hold an
//! `Arc<dyn RemoteApi>`; [`HttpApiClient`] is the production implementation.

#[cfg(test)]
pub(crate) mod fake;
pub mod http;

pub use http::HttpApiClient;

use crate::shared::models::{DailyStats, Goal, StepRecord, UserProfile, WeeklyTrend};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by remote calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// Missing, expired or rejected credentials
    #[error("not authorized")]
    Unauthorized,

    /// The server answered with a non-success status
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected shape
    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether replaying the same request later may succeed.
    ///
    /// Credentials can be refreshed, so `Unauthorized` is retryable. Client
    /// errors other than 408/429 and undecodable responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout | ApiError::Unauthorized => true,
            ApiError::Server { status, .. } => *status >= 500 || matches!(status, 408 | 429),
            ApiError::Decode(_) => false,
        }
    }
}

/// Remote fitness service
#[async_trait]
pub trait RemoteApi: Send + Sync + std::fmt::Debug {
    async fn fetch_today_stats(&self) -> Result<DailyStats, ApiError>;

    async fn fetch_weekly_trend(&self) -> Result<WeeklyTrend, ApiError>;

    async fn fetch_goals(&self) -> Result<Vec<Goal>, ApiError>;

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError>;

    /// Create a step record, returning the server's copy
    async fn create_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError>;

    async fn update_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError>;

    async fn create_goal(&self, goal: &Goal) -> Result<Goal, ApiError>;

    async fn update_goal(&self, goal: &Goal) -> Result<Goal, ApiError>;

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ApiError>;
}
