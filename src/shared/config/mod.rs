//! Application configuration module
//!
//! Provides configuration types for the sync core: where the server lives,
//! where the local store lives, and how aggressively failed rounds retry.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default path of the remote sync endpoint, relative to the server URL
pub const DEFAULT_SYNC_PATH: &str = "/sync";

/// Default request timeout for the sync call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Exponential backoff policy for failed sync rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Ceiling for any single delay
    pub max_delay: Duration,
    /// Failed attempts allowed before giving up
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(5_000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// `min(base_delay * 2^(attempt-1), max_delay)`; zero for attempt 0
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                message: "must be at least 1".into(),
            });
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigError::InvalidValue {
                field: "retry.base_delay",
                message: "must not exceed retry.max_delay".into(),
            });
        }
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Path of the sync endpoint
    pub sync_path: Option<String>,
    /// Location of the local database file
    pub database_path: Option<PathBuf>,
    /// Request timeout for the sync call
    pub request_timeout: Option<Duration>,
    /// Opaque bearer token forwarded to the server
    pub token: Option<String>,
    /// Maximum database size in SQLite pages
    pub storage_quota_pages: Option<u32>,
    /// Retry policy
    pub retry: RetryPolicy,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if let Some(path) = &self.sync_path {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "sync_path",
                    message: format!("'{}' must start with '/'", path),
                });
            }
        }
        if self.storage_quota_pages == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "storage_quota_pages",
                message: "must be greater than zero".into(),
            });
        }
        self.retry.validate()
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    sync_path: Option<String>,
    database_path: Option<PathBuf>,
    request_timeout: Option<Duration>,
    token: Option<String>,
    storage_quota_pages: Option<u32>,
    retry: Option<RetryPolicy>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the sync endpoint path
    pub fn sync_path(mut self, path: impl Into<String>) -> Self {
        self.sync_path = Some(path.into());
        self
    }

    /// Set the local database path
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Cap the local database size in pages
    pub fn storage_quota_pages(mut self, pages: u32) -> Self {
        self.storage_quota_pages = Some(pages);
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            server_url: self.server_url,
            sync_path: self.sync_path,
            database_path: self.database_path,
            request_timeout: self.request_timeout,
            token: self.token,
            storage_quota_pages: self.storage_quota_pages,
            retry: self.retry.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk TOML layout; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub server_url: Option<String>,
    pub sync_path: Option<String>,
    pub database_path: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub token: Option<String>,
    pub storage_quota_pages: Option<u32>,
    #[serde(default)]
    pub retry: Option<RetryFile>,
}

/// `[retry]` table of the TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryFile {
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl ConfigFile {
    /// Parse a TOML document
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Overlay the file onto a builder
    pub fn apply(self, mut builder: AppConfigBuilder) -> AppConfigBuilder {
        if let Some(url) = self.server_url {
            builder = builder.server_url(url);
        }
        if let Some(path) = self.sync_path {
            builder = builder.sync_path(path);
        }
        if let Some(path) = self.database_path {
            builder = builder.database_path(path);
        }
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(token) = self.token {
            builder = builder.token(token);
        }
        if let Some(pages) = self.storage_quota_pages {
            builder = builder.storage_quota_pages(pages);
        }
        if let Some(retry) = self.retry {
            let defaults = RetryPolicy::default();
            builder = builder.retry(RetryPolicy {
                base_delay: retry
                    .base_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.base_delay),
                max_delay: retry
                    .max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.max_delay),
                max_attempts: retry.max_attempts.unwrap_or(defaults.max_attempts),
            });
        }
        builder
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(String),
}
