//! Expense Record Types
//!
//! The unit of sync. A record is created offline under a client-generated
//! UUID and rewritten under the server-issued id once the server confirms it.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Sync status of a stored expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Awaiting first attempt or awaiting retry
    Pending,
    /// Confirmed by the server
    Synced,
    /// Last attempt errored; eligible for retry
    Failed,
}

impl SyncStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// A stored expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    /// Temp id (UUID v4) until synced, server id afterwards
    pub id: String,
    /// Owner; partition key for every query
    pub user_id: String,
    /// Amount, passed through unchanged
    pub amount: f64,
    /// Free-form note, passed through unchanged
    pub note: Option<String>,
    /// Calendar date, passed through unchanged
    pub date: String,
    /// Set once at creation; idempotency and ordering key
    pub created_at: DateTime<Utc>,
    /// Refreshed on every local mutation
    pub updated_at: DateTime<Utc>,
    /// True until the server confirms receipt
    pub pending_sync: bool,
    /// Current sync status
    pub sync_status: SyncStatus,
    /// True if the record has never existed server-side
    pub local_only: bool,
}

/// Input for creating a record; id and timestamps are assigned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub user_id: String,
    pub amount: f64,
    pub note: Option<String>,
    pub date: String,
    pub pending_sync: bool,
    pub sync_status: SyncStatus,
    pub local_only: bool,
}

impl NewExpense {
    /// A record written while offline: pending, local-only
    pub fn offline(
        user_id: impl Into<String>,
        amount: f64,
        note: Option<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            note,
            date: date.into(),
            pending_sync: true,
            sync_status: SyncStatus::Pending,
            local_only: true,
        }
    }
}

/// Partial update merged into an existing record
///
/// `id` set to a different value turns the update into a remap.
/// `created_at` and `user_id` are immutable and therefore absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub id: Option<String>,
    pub amount: Option<f64>,
    pub note: Option<Option<String>>,
    pub date: Option<String>,
    pub pending_sync: Option<bool>,
    pub sync_status: Option<SyncStatus>,
    pub local_only: Option<bool>,
}

impl ExpensePatch {
    /// Patch applied once the server confirms a record under `server_id`
    pub fn confirmed(server_id: impl Into<String>) -> Self {
        Self {
            id: Some(server_id.into()),
            pending_sync: Some(false),
            sync_status: Some(SyncStatus::Synced),
            local_only: Some(false),
            ..Self::default()
        }
    }

    /// Patch applied to every record of a failed round
    pub fn failed() -> Self {
        Self {
            sync_status: Some(SyncStatus::Failed),
            ..Self::default()
        }
    }

    /// Merge into `record`; `updated_at` is always refreshed
    pub fn apply_to(&self, record: &mut ExpenseRecord, now: DateTime<Utc>) {
        if let Some(id) = &self.id {
            record.id = id.clone();
        }
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(note) = &self.note {
            record.note = note.clone();
        }
        if let Some(date) = &self.date {
            record.date = date.clone();
        }
        if let Some(pending_sync) = self.pending_sync {
            record.pending_sync = pending_sync;
        }
        if let Some(sync_status) = self.sync_status {
            record.sync_status = sync_status;
        }
        if let Some(local_only) = self.local_only {
            record.local_only = local_only;
        }
        record.updated_at = now;
    }
}

/// Current UTC time at the millisecond precision timestamps are stored with
pub fn now_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// ISO-8601 UTC with millisecond precision and a `Z` suffix
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored ISO-8601 timestamp
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}
