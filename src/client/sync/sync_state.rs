//! # Sync State
//!
//! Result values returned by sync rounds and the per-user status view.

use crate::client::offline::retry::{RetryNotice, RetryPhase};
use crate::shared::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one sync round
///
/// Rounds never return `Err`; failures are reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    /// Records the server confirmed; on success this can be less than the
    /// batch size, and unconfirmed records stay pending for the next round
    pub synced_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

impl SyncOutcome {
    pub fn succeeded(synced_count: usize) -> Self {
        Self {
            success: true,
            synced_count,
            error: None,
            error_type: None,
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            synced_count: 0,
            error: Some(message.into()),
            error_type: Some(kind),
        }
    }
}

/// Snapshot of one user's sync situation
#[derive(Debug, Clone)]
pub struct SyncState {
    pub is_syncing: bool,
    pub online: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub pending_records: u64,
    pub failed_records: u64,
    pub retry_phase: RetryPhase,
    pub retry_notice: RetryNotice,
}
