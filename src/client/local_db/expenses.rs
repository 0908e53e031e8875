//! # Local Expense Operations
//!
//! CRUD operations for expense records in the local SQLite database.
//!
//! ## Features
//!
//! - **Create**: assigns a UUID v4 id and UTC timestamps
//! - **Partitioned reads**: every query is scoped to one `user_id`
//! - **Pending filter**: `get_pending_sync` selects on the `pending_sync` flag
//!   regardless of `sync_status`
//! - **Remap**: an update whose patch carries a new id deletes the old row
//!   and inserts the merged record under the new id in one transaction
//!
//! ## Usage
//!
//! ```rust,no_run
//! use expense_sync::client::local_db::LocalDatabase;
//! use expense_sync::shared::{ExpensePatch, NewExpense};
//!
//! # async fn example(db: LocalDatabase) -> Result<(), expense_sync::shared::StoreError> {
//! let record = db
//!     .create_expense(NewExpense::offline("user-1", 9.99, Some("coffee".into()), "2024-03-01"))
//!     .await?;
//!
//! // Server confirmed it as "srv-1"
//! let synced = db.update_expense(&record.id, ExpensePatch::confirmed("srv-1")).await?;
//! assert_eq!(synced.id, "srv-1");
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::error::StoreError;
use crate::shared::expense::{
    format_timestamp, now_timestamp, parse_timestamp, ExpensePatch, ExpenseRecord, NewExpense,
    SyncStatus,
};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, user_id, amount, note, date, created_at, updated_at,
    pending_sync, sync_status, local_only";

impl LocalDatabase {
    /// Store a new expense
    ///
    /// Fails with [`StoreError::QuotaExceeded`] when device storage is full.
    pub async fn create_expense(&self, new: NewExpense) -> Result<ExpenseRecord> {
        let now = now_timestamp();
        let record = ExpenseRecord {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            amount: new.amount,
            note: new.note,
            date: new.date,
            created_at: now,
            updated_at: now,
            pending_sync: new.pending_sync,
            sync_status: new.sync_status,
            local_only: new.local_only,
        };

        insert_expense(&self.pool, &record).await.map_err(|e| {
            if e.is_quota_exceeded() {
                tracing::warn!(user_id = %record.user_id, "Local store is full, expense not saved");
            }
            e
        })?;

        tracing::debug!(id = %record.id, user_id = %record.user_id, "Stored expense");
        Ok(record)
    }

    /// Get a single expense by id
    pub async fn get_expense(&self, id: &str) -> Result<Option<ExpenseRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM expenses WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_expense).transpose()
    }

    /// Every expense owned by `user_id`
    pub async fn get_all_expenses(&self, user_id: &str) -> Result<Vec<ExpenseRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM expenses WHERE user_id = ? ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_expense).collect()
    }

    /// Expenses owned by `user_id` on one calendar date
    pub async fn get_expenses_by_date(&self, user_id: &str, date: &str) -> Result<Vec<ExpenseRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM expenses WHERE user_id = ? AND date = ? ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_expense).collect()
    }

    /// Expenses owned by `user_id` that still await server confirmation
    pub async fn get_pending_sync(&self, user_id: &str) -> Result<Vec<ExpenseRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM expenses WHERE user_id = ? AND pending_sync = 1 ORDER BY created_at ASC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_expense).collect()
    }

    /// Merge `patch` into the record stored under `id`
    ///
    /// `updated_at` is always refreshed. When the patch carries a different
    /// id the record is moved: the old row is deleted and the merged record is
    /// inserted under the new id within one transaction.
    pub async fn update_expense(&self, id: &str, patch: ExpensePatch) -> Result<ExpenseRecord> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {} FROM expenses WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut record = match row {
            Some(row) => row_to_expense(&row)?,
            None => return Err(StoreError::not_found(id)),
        };

        patch.apply_to(&mut record, now_timestamp());

        if record.id != id {
            let taken = sqlx::query("SELECT 1 FROM expenses WHERE id = ?")
                .bind(&record.id)
                .fetch_optional(&mut *tx)
                .await?;
            if taken.is_some() {
                return Err(StoreError::already_exists(record.id));
            }

            sqlx::query("DELETE FROM expenses WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_expense(&mut *tx, &record).await?;

            tracing::debug!(old_id = %id, new_id = %record.id, "Remapped expense");
        } else {
            sqlx::query(
                "UPDATE expenses SET
                    amount = ?, note = ?, date = ?, updated_at = ?,
                    pending_sync = ?, sync_status = ?, local_only = ?
                 WHERE id = ?",
            )
            .bind(record.amount)
            .bind(&record.note)
            .bind(&record.date)
            .bind(format_timestamp(&record.updated_at))
            .bind(record.pending_sync)
            .bind(record.sync_status.as_str())
            .bind(record.local_only)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            tracing::debug!(id = %id, "Updated expense");
        }

        tx.commit().await?;
        Ok(record)
    }

    /// Remove an expense; deleting an unknown id is not an error
    pub async fn delete_expense(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(id = %id, removed = result.rows_affected(), "Deleted expense");
        Ok(())
    }
}

async fn insert_expense<'e, E>(executor: E, record: &ExpenseRecord) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO expenses (
            id, user_id, amount, note, date, created_at, updated_at,
            pending_sync, sync_status, local_only
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(record.amount)
    .bind(&record.note)
    .bind(&record.date)
    .bind(format_timestamp(&record.created_at))
    .bind(format_timestamp(&record.updated_at))
    .bind(record.pending_sync)
    .bind(record.sync_status.as_str())
    .bind(record.local_only)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_expense(row: &SqliteRow) -> Result<ExpenseRecord> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let sync_status: String = row.try_get("sync_status")?;

    Ok(ExpenseRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        note: row.try_get("note")?,
        date: row.try_get("date")?,
        created_at: parse_timestamp(&created_at)
            .map_err(|e| StoreError::serialization(format!("created_at: {}", e)))?,
        updated_at: parse_timestamp(&updated_at)
            .map_err(|e| StoreError::serialization(format!("updated_at: {}", e)))?,
        pending_sync: row.try_get("pending_sync")?,
        sync_status: sync_status
            .parse::<SyncStatus>()
            .map_err(StoreError::serialization)?,
        local_only: row.try_get("local_only")?,
    })
}
