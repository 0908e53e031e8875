//! # State Reconciliation
//!
//! Applies the outcome of a sync round to the local store.
//!
//! ## Features
//!
//! - **Confirm**: each `{tempId, serverId}` pair remaps the local record to
//!   the server id and marks it synced
//! - **Stray mappings**: pairs whose temp id was not part of the batch are
//!   skipped
//! - **Unmapped records**: batch records the server did not confirm stay
//!   pending and go out again in the next round
//! - **Fail**: every record of a failed batch is marked `failed` while staying
//!   pending
//!
//! Writes are per record, not one transaction. A crash midway leaves the
//! remaining records pending, and the next round picks them up.

use crate::client::local_db::LocalDatabase;
use crate::shared::error::StoreError;
use crate::shared::expense::ExpensePatch;
use crate::shared::sync_protocol::IdMapping;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// What a successful round changed in the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Server ids of records now marked synced
    pub synced: Vec<String>,
    /// Batch ids the server did not confirm
    pub unmapped: Vec<String>,
    /// Mapped temp ids that were not in the batch
    pub ignored: Vec<String>,
}

impl ReconciliationReport {
    /// Number of records confirmed
    pub fn synced_count(&self) -> usize {
        self.synced.len()
    }
}

/// Applying the mappings stopped on a store error
#[derive(Debug, Error)]
#[error("reconciliation stopped after {} record(s): {source}", .applied.len())]
pub struct ReconciliationError {
    /// Batch ids that were already confirmed before the failure
    pub applied: Vec<String>,
    #[source]
    pub source: StoreError,
}

/// Writes sync results back into the local store
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<LocalDatabase>,
}

impl Reconciler {
    /// Create a reconciler over `store`
    pub fn new(store: Arc<LocalDatabase>) -> Self {
        Self { store }
    }

    /// Confirm every batch record the server mapped
    pub async fn apply_mappings(
        &self,
        batch_ids: &[String],
        mappings: &[IdMapping],
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let batch: HashSet<&str> = batch_ids.iter().map(String::as_str).collect();
        let mut confirmed: HashSet<&str> = HashSet::new();
        let mut report = ReconciliationReport::default();
        let mut applied = Vec::new();

        for mapping in mappings {
            let temp_id = mapping.temp_id.as_str();
            if !batch.contains(temp_id) || confirmed.contains(temp_id) {
                tracing::warn!(
                    temp_id = %mapping.temp_id,
                    server_id = %mapping.server_id,
                    "Ignoring mapping for a record outside this batch"
                );
                report.ignored.push(mapping.temp_id.clone());
                continue;
            }

            match self
                .store
                .update_expense(temp_id, ExpensePatch::confirmed(mapping.server_id.clone()))
                .await
            {
                Ok(record) => {
                    confirmed.insert(temp_id);
                    applied.push(mapping.temp_id.clone());
                    report.synced.push(record.id);
                }
                Err(source) => {
                    tracing::warn!(
                        temp_id = %mapping.temp_id,
                        error = %source,
                        "Failed to confirm synced expense"
                    );
                    return Err(ReconciliationError { applied, source });
                }
            }
        }

        report.unmapped = batch_ids
            .iter()
            .filter(|id| !confirmed.contains(id.as_str()))
            .cloned()
            .collect();

        if !report.unmapped.is_empty() {
            tracing::warn!(
                count = report.unmapped.len(),
                "Server did not confirm every record; leaving them pending"
            );
        }

        Ok(report)
    }

    /// Mark `ids` as failed; records that disappeared meanwhile are skipped
    pub async fn mark_failed(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut marked = 0;
        for id in ids {
            match self.store.update_expense(id, ExpensePatch::failed()).await {
                Ok(_) => marked += 1,
                Err(StoreError::NotFound { .. }) => {
                    tracing::warn!(id = %id, "Expense vanished before it could be marked failed");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(marked)
    }
}
