use crate::client::local_db::schema::DATABASE_NAME;
use crate::shared::config::{
    AppConfig, AppConfigBuilder, ConfigError, ConfigFile, RetryPolicy, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SYNC_PATH,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Environment variable overriding the server URL
pub const ENV_API_URL: &str = "EXPENSE_SYNC_API_URL";
/// Environment variable overriding the database file
pub const ENV_DB_PATH: &str = "EXPENSE_SYNC_DB_PATH";
/// Environment variable carrying the bearer token
pub const ENV_TOKEN: &str = "EXPENSE_SYNC_TOKEN";

/// Client configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
}

impl Default for Config {
    fn default() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring invalid environment configuration");
                Self {
                    app: AppConfig::default(),
                }
            }
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the `EXPENSE_SYNC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_builder(env_builder())
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app })
    }

    /// Parse a TOML document; values in the file win over the environment
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file = ConfigFile::parse(raw)?;
        Self::with_builder(file.apply(env_builder()))
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Underlying validated configuration
    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.app.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&str> {
        self.app.token.as_deref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.app.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url().trim_end_matches('/'), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn sync_path(&self) -> &str {
        self.app.sync_path.as_deref().unwrap_or(DEFAULT_SYNC_PATH)
    }

    /// Full URL of the sync endpoint
    pub fn sync_url(&self) -> String {
        self.api_url(self.sync_path())
    }

    pub fn request_timeout(&self) -> Duration {
        self.app.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Configured database file, or one under the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.app
            .database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    pub fn storage_quota_pages(&self) -> Option<u32> {
        self.app.storage_quota_pages
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.app.retry
    }
}

fn env_builder() -> AppConfigBuilder {
    let mut builder = AppConfig::builder();
    if let Ok(url) = std::env::var(ENV_API_URL) {
        builder = builder.server_url(url);
    }
    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        builder = builder.database_path(path);
    }
    if let Ok(token) = std::env::var(ENV_TOKEN) {
        builder = builder.token(token);
    }
    builder
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("expense-sync")
        .join(format!("{}.db", DATABASE_NAME))
}
