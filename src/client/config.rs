use crate::client::local_db::LocalDatabase;
use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use std::path::PathBuf;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Overrides the server URL
pub const ENV_API_URL: &str = "FITSYNC_API_URL";
/// Overrides the database location
pub const ENV_DB_PATH: &str = "FITSYNC_DB_PATH";
/// Overrides the log filter
pub const ENV_LOG: &str = "FITSYNC_LOG";
/// Bearer token for the remote API
pub const ENV_TOKEN: &str = "FITSYNC_TOKEN";

/// Client configuration wrapper.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_app(app: AppConfig) -> Self {
        Self { app, token: None }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::from_app(builder.build()?))
    }

    /// Apply `FITSYNC_*` environment overrides on top of `app`
    pub fn from_env(app: AppConfig) -> Result<Self, ConfigError> {
        Self::with_overrides(app, |key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`, then validate
    pub fn with_overrides(
        mut app: AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup(ENV_API_URL) {
            app.server_url = Some(url);
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            app.database_path = Some(PathBuf::from(path));
        }
        if let Some(filter) = lookup(ENV_LOG) {
            app.log_filter = Some(filter);
        }
        app.validate()?;

        Ok(Self {
            app,
            token: lookup(ENV_TOKEN),
        })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Configured database location, or the platform default
    pub fn database_path(&self) -> PathBuf {
        self.app
            .database_path
            .clone()
            .unwrap_or_else(LocalDatabase::default_path)
    }

    /// Filter for the log subscriber
    pub fn log_filter(&self) -> &str {
        self.app.log_filter.as_deref().unwrap_or("fitsync=info")
    }
}
