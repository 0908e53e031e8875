//! # Sync Dispatcher
//!
//! Runs reconciliation rounds: pending records go to the server in one batch,
//! the returned id mappings are applied to the local store, and failures feed
//! the retry controller.
//!
//! ## Round
//!
//! 1. Read the user's pending records; an empty queue succeeds without any
//!    network call.
//! 2. Submit them as one batch.
//! 3. On success, remap each confirmed record to its server id, reset the
//!    retry state and record the sync time.
//! 4. On failure, mark the batch `failed` (still pending), record an attempt
//!    and report the classified error.
//!
//! ## Single-flight
//!
//! At most one round runs per user. A second `sync` call for the same user
//! while a round is in flight awaits that round and gets the same outcome.
//! Rounds are spawned, so the network call finishes even if every caller
//! stops waiting.

use crate::client::local_db::LocalDatabase;
use crate::client::offline::reconciliation::{ReconciliationError, Reconciler};
use crate::client::offline::retry::RetryController;
use crate::client::sync::api::SyncApi;
use crate::client::sync::metrics::SyncMetrics;
use crate::client::sync::sync_state::SyncOutcome;
use crate::shared::error::{ErrorKind, SyncError};
use crate::shared::sync_protocol::SyncItem;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

type SharedRound = Shared<BoxFuture<'static, SyncOutcome>>;

/// Sync round orchestrator; cheap to clone
#[derive(Debug, Clone)]
pub struct SyncDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    store: Arc<LocalDatabase>,
    retry: Arc<RetryController>,
    api: Arc<dyn SyncApi>,
    reconciler: Reconciler,
    metrics: RwLock<SyncMetrics>,
    /// User id to the round currently running for it
    in_flight: Mutex<HashMap<String, SharedRound>>,
}

impl std::fmt::Debug for DispatcherInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherInner")
            .field("store", &self.store)
            .field("retry", &self.retry)
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl SyncDispatcher {
    pub fn new(
        store: Arc<LocalDatabase>,
        retry: Arc<RetryController>,
        api: Arc<dyn SyncApi>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                reconciler: Reconciler::new(store.clone()),
                store,
                retry,
                api,
                metrics: RwLock::new(SyncMetrics::new()),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Run one round for `user_id`, or join the one already running
    ///
    /// Does not consult the retry controller; callers decide when to sync.
    pub async fn sync(&self, user_id: &str) -> SyncOutcome {
        let round = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.get(user_id) {
                Some(round) => {
                    tracing::debug!(user_id = %user_id, "Joining in-flight sync round");
                    round.clone()
                }
                None => {
                    let round = self.spawn_round(user_id.to_string());
                    in_flight.insert(user_id.to_string(), round.clone());
                    round
                }
            }
        };
        round.await
    }

    /// Whether a round is currently running for `user_id`
    pub async fn is_syncing(&self, user_id: &str) -> bool {
        self.inner.in_flight.lock().await.contains_key(user_id)
    }

    pub fn store(&self) -> &Arc<LocalDatabase> {
        &self.inner.store
    }

    pub fn retry(&self) -> &Arc<RetryController> {
        &self.inner.retry
    }

    pub fn api(&self) -> &Arc<dyn SyncApi> {
        &self.inner.api
    }

    /// Snapshot of the round counters
    pub async fn metrics(&self) -> SyncMetrics {
        self.inner.metrics.read().await.clone()
    }

    fn spawn_round(&self, user_id: String) -> SharedRound {
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let outcome = inner.run_round(&user_id).await;
            inner.in_flight.lock().await.remove(&user_id);
            outcome
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Sync round task did not complete");
                SyncOutcome::failed(ErrorKind::Unknown, format!("sync round aborted: {}", e))
            })
        }
        .boxed()
        .shared()
    }
}

impl DispatcherInner {
    async fn run_round(&self, user_id: &str) -> SyncOutcome {
        let started = Instant::now();

        let pending = match self.store.get_pending_sync(user_id).await {
            Ok(pending) => pending,
            Err(e) => return self.fail(user_id, &[], SyncError::Store(e), started).await,
        };

        if pending.is_empty() {
            tracing::debug!(user_id = %user_id, "Nothing to sync");
            self.metrics.write().await.record_empty();
            return SyncOutcome::succeeded(0);
        }

        let batch_ids: Vec<String> = pending.iter().map(|record| record.id.clone()).collect();
        let items: Vec<SyncItem> = pending.iter().map(SyncItem::from).collect();

        tracing::info!(user_id = %user_id, count = items.len(), "Starting sync round");

        let mappings = match self.api.sync_batch(items).await {
            Ok(mappings) => mappings,
            Err(e) => return self.fail(user_id, &batch_ids, e, started).await,
        };

        let report = match self.reconciler.apply_mappings(&batch_ids, &mappings).await {
            Ok(report) => report,
            Err(ReconciliationError { applied, source }) => {
                let remaining: Vec<String> = batch_ids
                    .into_iter()
                    .filter(|id| !applied.contains(id))
                    .collect();
                return self
                    .fail(user_id, &remaining, SyncError::Store(source), started)
                    .await;
            }
        };

        self.retry.reset_retry_state(user_id).await;
        if let Err(e) = self.store.set_last_sync_time(user_id).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to record last sync time");
        }

        let synced = report.synced_count();
        self.metrics
            .write()
            .await
            .record_success(synced, started.elapsed());

        tracing::info!(
            user_id = %user_id,
            synced,
            unmapped = report.unmapped.len(),
            "Sync round succeeded"
        );
        SyncOutcome::succeeded(synced)
    }

    async fn fail(
        &self,
        user_id: &str,
        batch_ids: &[String],
        error: SyncError,
        started: Instant,
    ) -> SyncOutcome {
        let kind = error.kind();

        if let Err(e) = self.reconciler.mark_failed(batch_ids).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to mark batch as failed");
        }
        let state = self.retry.record_attempt(user_id).await;
        self.metrics
            .write()
            .await
            .record_failure(kind, started.elapsed());

        tracing::warn!(
            user_id = %user_id,
            kind = %kind,
            attempts = state.attempt_count,
            error = %error,
            "Sync round failed"
        );
        SyncOutcome::failed(kind, error.to_string())
    }
}
