//! HTTP implementation of [`RemoteApi`] over reqwest.

use super::{ApiError, RemoteApi};
use crate::client::config::Config;
use crate::shared::models::{DailyStats, Goal, StepRecord, UserProfile, WeeklyTrend};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Fitness API client
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    config: Config,
    client: Client,
}

impl HttpApiClient {
    /// Build a client applying the configured request timeout
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.app().request_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(config: Config, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.get_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            tracing::debug!("[API] Request failed: {} - {}", status, error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
                _ => ApiError::Server {
                    status: status.as_u16(),
                    message: error_text,
                },
            });
        }

        response.json::<T>().await.map_err(Self::map_transport_error)
    }

    fn map_transport_error(e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.config.api_url(path);
        tracing::trace!("[API] GET {}", url);
        self.send(self.client.get(&url)).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.api_url(path);
        tracing::trace!("[API] POST {}", url);
        self.send(self.client.post(&url).json(body)).await
    }

    async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.api_url(path);
        tracing::trace!("[API] PUT {}", url);
        self.send(self.client.put(&url).json(body)).await
    }
}

#[async_trait]
impl RemoteApi for HttpApiClient {
    async fn fetch_today_stats(&self) -> Result<DailyStats, ApiError> {
        self.get("/api/steps/today").await
    }

    async fn fetch_weekly_trend(&self) -> Result<WeeklyTrend, ApiError> {
        self.get("/api/steps/weekly").await
    }

    async fn fetch_goals(&self) -> Result<Vec<Goal>, ApiError> {
        self.get("/api/goals").await
    }

    async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.get("/api/profile").await
    }

    async fn create_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError> {
        self.post("/api/steps", record).await
    }

    async fn update_step(&self, record: &StepRecord) -> Result<StepRecord, ApiError> {
        self.put(&format!("/api/steps/{}", record.id), record).await
    }

    async fn create_goal(&self, goal: &Goal) -> Result<Goal, ApiError> {
        self.post("/api/goals", goal).await
    }

    async fn update_goal(&self, goal: &Goal) -> Result<Goal, ApiError> {
        self.put(&format!("/api/goals/{}", goal.id), goal).await
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ApiError> {
        self.put("/api/profile", profile).await
    }
}
