//! Application configuration module
//!
//! Provides the configuration types for the sync core. A configuration can be
//! assembled with [`AppConfigBuilder`] or read from a TOML file:
//!
//! ```toml
//! server_url = "https://api.example.com"
//! database_path = "/var/lib/fitsync/local.db"
//! max_retry = 5
//! sync_interval_secs = 30
//! request_timeout_secs = 15
//! failed_retention_hours = 168
//! log_filter = "fitsync=debug"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default retry cap for queued operations
pub const DEFAULT_MAX_RETRY: u32 = 5;

/// Default interval between periodic drains
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;

/// Default timeout applied to each remote request
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Failed operations older than this are removed by the daemon (one week)
pub const DEFAULT_FAILED_RETENTION_HOURS: u64 = 24 * 7;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Location of the local SQLite database; `None` selects the platform default
    pub database_path: Option<PathBuf>,
    /// Number of failed replays after which an operation is terminal
    pub max_retry: u32,
    /// Seconds between periodic drains while online
    pub sync_interval_secs: u64,
    /// Per-request timeout for the remote API
    pub request_timeout_secs: u64,
    /// How long terminally failed operations are kept before cleanup
    pub failed_retention_hours: u64,
    /// `tracing` filter directive used by the daemon
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            database_path: None,
            max_retry: DEFAULT_MAX_RETRY,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            failed_retention_hours: DEFAULT_FAILED_RETENTION_HOURS,
            log_filter: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.max_retry == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retry",
                message: "must be at least 1".to_string(),
            });
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync_interval_secs",
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn failed_retention(&self) -> Duration {
        Duration::from_secs(self.failed_retention_hours * 3600)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = Some(url.into());
        self
    }

    /// Set the database location
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.config.max_retry = max_retry;
        self
    }

    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.config.sync_interval_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn failed_retention_hours(mut self, hours: u64) -> Self {
        self.config.failed_retention_hours = hours;
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = Some(filter.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_defaults() {
        let config = AppConfig::builder().build().unwrap();
        assert_eq!(config.max_retry, DEFAULT_MAX_RETRY);
        assert_eq!(config.sync_interval(), Duration::from_secs(30));
        assert!(config.server_url.is_none());
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let result = AppConfig::builder().server_url("ftp://example.com").build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_builder_rejects_zero_retry() {
        let result = AppConfig::builder().max_retry(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "max_retry", .. })
        ));
    }

    #[test]
    fn test_from_toml_str() {
        let config = AppConfig::from_toml_str(
            r#"
            server_url = "https://fit.example.com"
            max_retry = 3
            sync_interval_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url.as_deref(), Some("https://fit.example.com"));
        assert_eq!(config.max_retry, 3);
        assert_eq!(config.sync_interval_secs, 10);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let result = AppConfig::from_toml_str("retries = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = \"/tmp/fitsync-test.db\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/fitsync-test.db")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
