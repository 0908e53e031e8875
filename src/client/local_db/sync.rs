//! # Sync Metadata Operations
//!
//! Key/value bookkeeping for synchronization, most notably the time of the
//! last successful round per user.

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::error::StoreError;
use crate::shared::expense::{format_timestamp, now_timestamp, parse_timestamp};
use chrono::{DateTime, Utc};
use sqlx::Row;

fn last_sync_key(user_id: &str) -> String {
    format!("last_sync_time:{}", user_id)
}

impl LocalDatabase {
    /// Set sync metadata
    pub async fn set_sync_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO sync_metadata (key, value, updated_at)
             VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get sync metadata
    pub async fn get_sync_metadata(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM sync_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    /// Record now as the last successful sync for `user_id`
    pub async fn set_last_sync_time(&self, user_id: &str) -> Result<DateTime<Utc>> {
        let now = now_timestamp();
        self.set_sync_metadata(&last_sync_key(user_id), &format_timestamp(&now))
            .await?;
        Ok(now)
    }

    /// Last successful sync for `user_id`, if any
    pub async fn get_last_sync_time(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get_sync_metadata(&last_sync_key(user_id)).await? {
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .map_err(|e| StoreError::serialization(format!("last_sync_time: {}", e))),
            None => Ok(None),
        }
    }
}
