//! # Sync Service
//!
//! Wires the offline-first sync core together and hands out shared
//! references to each component.
//!
//! ## Architecture
//!
//! - **Local store**: durable pending records ([`LocalDatabase`])
//! - **Retry controller**: per-user backoff budget ([`RetryController`])
//! - **Network monitor**: connectivity transitions ([`ConnectivityObserver`])
//! - **Dispatcher**: one batch round per call, single-flight per user
//! - **Scheduler**: per-user auto-sync handles driven by connectivity and
//!   backoff
//! - **Metrics**: round counters
//!
//! Every component is constructed once here and shared by reference, so the
//! dispatcher and the scheduler always see the same retry state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use expense_sync::client::{Config, SyncService};
//! use expense_sync::shared::NewExpense;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = SyncService::new(Config::new()).await?;
//!
//! service
//!     .store()
//!     .create_expense(NewExpense::offline("user-1", 4.5, None, "2024-03-01"))
//!     .await?;
//!
//! // Sync automatically while this handle lives
//! let handle = service.auto_sync("user-1");
//!
//! // Host reports connectivity changes
//! service.connectivity().set_online(false);
//!
//! // Manual "sync now" button
//! let outcome = handle.sync_now().await;
//! println!("synced {} records", outcome.synced_count);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod dispatcher;
pub mod metrics;
pub mod network_monitor;
pub mod scheduler;
pub mod sync_state;

pub use api::{HttpSyncApi, SyncApi};
pub use dispatcher::SyncDispatcher;
pub use metrics::SyncMetrics;
pub use network_monitor::{
    spawn_reachability_probe, ConnectivityEvent, ConnectivityObserver, ConnectivitySubscription,
    ListenerHandle,
};
pub use scheduler::{AutoSyncHandle, AutoSyncTrigger};
pub use sync_state::{SyncOutcome, SyncState};

use crate::client::config::Config;
use crate::client::local_db::LocalDatabase;
use crate::client::offline::retry::{Clock, RetryController, SystemClock};
use crate::shared::error::{StoreError, SyncError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Main sync service coordinator
#[derive(Debug)]
pub struct SyncService {
    config: Config,
    store: Arc<LocalDatabase>,
    retry: Arc<RetryController>,
    connectivity: Arc<ConnectivityObserver>,
    dispatcher: SyncDispatcher,
    trigger: AutoSyncTrigger,
}

impl SyncService {
    /// Open the configured database and talk to the configured server
    ///
    /// Connectivity starts out as online; the host corrects it through
    /// [`ConnectivityObserver::set_online`] or a reachability probe.
    pub async fn new(config: Config) -> Result<Self, SyncError> {
        let store = LocalDatabase::open(config.database_path(), config.storage_quota_pages()).await?;
        let api = HttpSyncApi::new(&config)?;

        tracing::info!(
            server = %config.server_url(),
            database = %config.database_path().display(),
            "Sync service initialized"
        );

        Ok(Self::with_components(
            config,
            Arc::new(store),
            Arc::new(api),
            Arc::new(SystemClock),
            true,
        ))
    }

    /// Assemble the service from explicit parts
    pub fn with_components(
        config: Config,
        store: Arc<LocalDatabase>,
        api: Arc<dyn SyncApi>,
        clock: Arc<dyn Clock>,
        initially_online: bool,
    ) -> Self {
        let retry = Arc::new(RetryController::with_clock(config.retry_policy(), clock));
        let connectivity = Arc::new(ConnectivityObserver::new(initially_online));
        let dispatcher = SyncDispatcher::new(store.clone(), retry.clone(), api);
        let trigger = AutoSyncTrigger::new(dispatcher.clone(), connectivity.clone());

        Self {
            config,
            store,
            retry,
            connectivity,
            dispatcher,
            trigger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<LocalDatabase> {
        &self.store
    }

    pub fn retry(&self) -> &Arc<RetryController> {
        &self.retry
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityObserver> {
        &self.connectivity
    }

    pub fn dispatcher(&self) -> &SyncDispatcher {
        &self.dispatcher
    }

    /// Round counters
    pub async fn metrics(&self) -> SyncMetrics {
        self.dispatcher.metrics().await
    }

    /// Start automatic syncing for `user_id`; stops when the handle is dropped
    pub fn auto_sync(&self, user_id: impl Into<String>) -> AutoSyncHandle {
        self.trigger.acquire(user_id)
    }

    /// Run a round now regardless of the retry budget
    pub async fn sync_now(&self, user_id: &str) -> SyncOutcome {
        self.dispatcher.sync(user_id).await
    }

    /// Feed connectivity from the server's health check every `interval`
    pub fn spawn_reachability_probe(&self, interval: Duration) -> JoinHandle<()> {
        spawn_reachability_probe(
            self.connectivity.clone(),
            self.dispatcher.api().clone(),
            interval,
        )
    }

    /// Current sync situation for `user_id`
    pub async fn status(&self, user_id: &str) -> Result<SyncState, StoreError> {
        let stats = self.store.get_stats(user_id).await?;
        Ok(SyncState {
            is_syncing: self.dispatcher.is_syncing(user_id).await,
            online: self.connectivity.current(),
            last_sync: self.store.get_last_sync_time(user_id).await?,
            pending_records: stats.pending_records,
            failed_records: stats.failed_records,
            retry_phase: self.retry.phase(user_id).await,
            retry_notice: self.retry.notice(user_id).await,
        })
    }
}
