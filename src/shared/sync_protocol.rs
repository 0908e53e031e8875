//! Sync Wire Format
//!
//! Request and response bodies of `POST /sync`.
//!
//! Request: a JSON array of [`SyncItem`].
//! Response: `{ "success": true, "data": { "synced": [{ "tempId", "serverId" }] } }`.

use crate::shared::error::SyncError;
use crate::shared::expense::{format_timestamp, ExpenseRecord};
use serde::{Deserialize, Serialize};

/// One record in the outgoing batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    /// The record's current local id
    pub temp_id: String,
    pub amount: f64,
    pub note: Option<String>,
    pub date: String,
    /// ISO-8601 UTC creation time
    pub created_at: String,
}

impl From<&ExpenseRecord> for SyncItem {
    fn from(record: &ExpenseRecord) -> Self {
        Self {
            temp_id: record.id.clone(),
            amount: record.amount,
            note: record.note.clone(),
            date: record.date.clone(),
            created_at: format_timestamp(&record.created_at),
        }
    }
}

/// Server confirmation for one submitted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMapping {
    pub temp_id: String,
    pub server_id: String,
}

/// `data` member of a sync response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponseData {
    pub synced: Option<Vec<IdMapping>>,
}

/// Raw response body; validated by [`SyncResponse::into_mappings`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<SyncResponseData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SyncResponse {
    /// A well-formed success body carrying `mappings`
    pub fn success(mappings: Vec<IdMapping>) -> Self {
        Self {
            success: true,
            data: Some(SyncResponseData {
                synced: Some(mappings),
            }),
            error: None,
            message: None,
        }
    }

    /// Extract the id mappings, or fail with `Unknown` when the body is malformed
    pub fn into_mappings(self) -> Result<Vec<IdMapping>, SyncError> {
        if !self.success {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "server reported failure".to_string());
            return Err(SyncError::unknown(reason));
        }
        self.data
            .and_then(|data| data.synced)
            .ok_or_else(|| SyncError::unknown("response is missing data.synced"))
    }
}
