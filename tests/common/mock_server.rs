//! Mock sync endpoint helpers for integration tests
//!
//! Wraps `wiremock` with responders that speak the `/sync` wire format and a
//! harness that wires a [`SyncService`] to the mock server.

use expense_sync::client::offline::retry::{Clock, ManualClock, SystemClock};
use expense_sync::client::sync::HttpSyncApi;
use expense_sync::client::{Config, SyncService};
use expense_sync::shared::{AppConfig, IdMapping, RetryPolicy, SyncItem, SyncResponse};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Epoch millis the manual clock starts at
pub const CLOCK_START: i64 = 1_709_280_000_000;

pub const USER: &str = "user-1";

/// Confirms every submitted record as `srv-<tempId>`
pub struct EchoSync;

impl Respond for EchoSync {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        match request.body_json::<Vec<SyncItem>>() {
            Ok(items) => {
                let mappings = items
                    .into_iter()
                    .map(|item| IdMapping {
                        server_id: format!("srv-{}", item.temp_id),
                        temp_id: item.temp_id,
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(SyncResponse::success(mappings))
            }
            Err(e) => ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"success": false, "error": e.to_string()})),
        }
    }
}

/// Respond to `POST /sync` with a fixed mapping list
pub async fn mount_sync_success(server: &MockServer, mappings: &[(&str, &str)]) {
    let mappings = mappings
        .iter()
        .map(|(temp, srv)| IdMapping {
            temp_id: temp.to_string(),
            server_id: srv.to_string(),
        })
        .collect();
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(SyncResponse::success(mappings)))
        .mount(server)
        .await;
}

/// Respond to `POST /sync` by confirming whatever was sent
pub async fn mount_sync_echo(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(EchoSync)
        .mount(server)
        .await;
}

/// Respond to the next `times` calls with `status`
pub async fn mount_sync_status(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(serde_json::json!({"success": false, "error": "rejected"})),
        )
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Stall the next `times` calls past the client timeout
pub async fn mount_sync_timeout(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Number of requests the mock server has seen
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

/// A sync service talking to a mock server over a fresh in-memory store
pub struct SyncHarness {
    pub server: MockServer,
    pub service: SyncService,
    pub clock: Option<Arc<ManualClock>>,
}

impl SyncHarness {
    /// Default policy on a manual clock
    pub async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(CLOCK_START));
        Self::build(RetryPolicy::default(), clock.clone(), Some(clock)).await
    }

    /// Custom policy on the system clock, for timer-driven tests
    pub async fn realtime(policy: RetryPolicy) -> Self {
        Self::build(policy, Arc::new(SystemClock), None).await
    }

    async fn build(
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
        manual: Option<Arc<ManualClock>>,
    ) -> Self {
        let server = MockServer::start().await;
        let config = Config::with_builder(
            AppConfig::builder()
                .server_url(server.uri())
                .request_timeout(Duration::from_millis(300))
                .retry(policy),
        )
        .expect("Failed to build test config");
        let api = Arc::new(HttpSyncApi::new(&config).expect("Failed to build HTTP client"));
        let store = super::create_test_store().await;
        let service = SyncService::with_components(config, store, api, clock, true);

        Self {
            server,
            service,
            clock: manual,
        }
    }

    /// Advance the manual clock
    pub fn advance(&self, by: Duration) {
        if let Some(clock) = &self.clock {
            clock.advance(by);
        }
    }
}
