//! # Remote Sync Endpoint
//!
//! The server is a black box reached through [`SyncApi`]. [`HttpSyncApi`] is
//! the production implementation: one `POST` carrying the whole pending batch.
//!
//! ## Failure classification
//!
//! - transport errors (connect, timeout, DNS) → `Network`
//! - 400 / 422 → `Validation`
//! - 401 / 5xx → `Server`
//! - any other non-2xx → `Unknown`
//! - a 2xx body that is not `{success: true, data: {synced: [...]}}` → `Unknown`

use crate::client::config::Config;
use crate::shared::error::SyncError;
use crate::shared::sync_protocol::{IdMapping, SyncItem, SyncResponse};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::Client;

/// Path probed by [`SyncApi::health_check`]
pub const HEALTH_PATH: &str = "/health";

/// Remote collaborator that accepts a batch of pending records
pub trait SyncApi: Send + Sync + std::fmt::Debug {
    /// Submit one batch and return the server's id mappings
    fn sync_batch(&self, items: Vec<SyncItem>) -> BoxFuture<'_, Result<Vec<IdMapping>, SyncError>>;

    /// Whether the server answered at all
    fn health_check(&self) -> BoxFuture<'_, bool>;
}

/// `reqwest`-backed sync endpoint
#[derive(Debug, Clone)]
pub struct HttpSyncApi {
    client: Client,
    sync_url: String,
    health_url: String,
    token: Option<String>,
}

impl HttpSyncApi {
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::unknown(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            sync_url: config.sync_url(),
            health_url: config.api_url(HEALTH_PATH),
            token: config.get_token().map(str::to_string),
        })
    }

    /// Full URL of the sync endpoint
    pub fn sync_url(&self) -> &str {
        &self.sync_url
    }

    async fn post_batch(&self, items: Vec<SyncItem>) -> Result<Vec<IdMapping>, SyncError> {
        let mut request = self.client.post(&self.sync_url).json(&items);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %self.sync_url, count = items.len(), "POST sync batch");

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::from_status(
                status.as_u16(),
                error_message(&body, status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::network(e.to_string()))?;
        let parsed: SyncResponse = serde_json::from_slice(&body)?;
        parsed.into_mappings()
    }
}

impl SyncApi for HttpSyncApi {
    fn sync_batch(&self, items: Vec<SyncItem>) -> BoxFuture<'_, Result<Vec<IdMapping>, SyncError>> {
        self.post_batch(items).boxed()
    }

    fn health_check(&self) -> BoxFuture<'_, bool> {
        async move {
            match self.client.get(&self.health_url).send().await {
                Ok(_) => true,
                Err(e) => {
                    tracing::debug!(url = %self.health_url, error = %e, "Health check failed");
                    false
                }
            }
        }
        .boxed()
    }
}

/// Prefer the server's `error`/`message` field, then the raw body, then the reason phrase
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<SyncResponse>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
