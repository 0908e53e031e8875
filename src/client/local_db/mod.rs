//! # Local Database Module
//!
//! Durable on-device store for expense records, backed by SQLite.
//!
//! ## Architecture
//!
//! - **Expenses**: one table keyed by `id`, indexed by `user_id`, `date`
//!   and `pending_sync`
//! - **Sync Metadata**: key/value pairs such as the last successful sync time
//! - **Migrations**: versioned, create-if-absent; reopening an up-to-date
//!   store is a no-op
//!
//! ## Key Components
//!
//! - `LocalDatabase`: connection pool and schema management
//! - `schema.rs`: schema constants and migrations
//! - `expenses.rs`: record CRUD, filters and the remap operation
//! - `sync.rs`: synchronization metadata
//!
//! ## Usage
//!
//! ```rust,no_run
//! use expense_sync::client::local_db::LocalDatabase;
//! use expense_sync::shared::NewExpense;
//!
//! # async fn example() -> Result<(), expense_sync::shared::StoreError> {
//! let db = LocalDatabase::open("/tmp/expenses.db", None).await?;
//! let record = db
//!     .create_expense(NewExpense::offline("user-1", 12.5, None, "2024-03-01"))
//!     .await?;
//! let pending = db.get_pending_sync("user-1").await?;
//! assert_eq!(pending[0].id, record.id);
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod expenses;
pub mod sync;

use crate::shared::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Local database connection manager
///
/// The pool holds a single connection: every write is serialized, which is
/// what the one-writer sync model expects, and in-memory databases survive
/// for the lifetime of the pool.
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create a database file
    ///
    /// `quota_pages` caps the database size; writes beyond it fail with
    /// [`StoreError::QuotaExceeded`].
    pub async fn open(path: impl AsRef<Path>, quota_pages: Option<u32>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        tracing::info!(path = %path.display(), "Opening local database");
        Self::connect(options, quota_pages).await
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        Self::in_memory_with_quota(None).await
    }

    /// Open a private in-memory database with a page quota
    pub async fn in_memory_with_quota(quota_pages: Option<u32>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, quota_pages).await
    }

    async fn connect(options: SqliteConnectOptions, quota_pages: Option<u32>) -> Result<Self> {
        let mut options = options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .pragma("temp_store", "MEMORY");

        if let Some(pages) = quota_pages {
            options = options.pragma("max_page_count", pages.to_string());
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize database schema
    ///
    /// Applies every migration newer than the recorded version.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let current_version = self.schema_version().await?;

        if current_version > schema::CURRENT_SCHEMA_VERSION {
            return Err(StoreError::migration(format!(
                "database schema version {} is newer than supported version {}",
                current_version,
                schema::CURRENT_SCHEMA_VERSION
            )));
        }

        if !schema::needs_migration(current_version) {
            tracing::debug!(version = current_version, "Local database schema is current");
            return Ok(());
        }

        for (version, statements) in schema::get_pending_migrations(current_version) {
            self.apply_migration(version, statements).await?;
        }

        Ok(())
    }

    /// Apply one migration atomically and record it
    async fn apply_migration(&self, version: i32, statements: &[&str]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for statement in statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(version, "Applied local database migration");
        Ok(())
    }

    /// Highest applied migration, 0 for a fresh database
    pub async fn schema_version(&self) -> Result<i32> {
        let (version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool; pending writes are flushed first
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Per-user record counts
    pub async fn get_stats(&self, user_id: &str) -> Result<DatabaseStats> {
        let (total, pending, failed, synced): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN pending_sync = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN sync_status = 'failed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN sync_status = 'synced' THEN 1 ELSE 0 END), 0)
             FROM expenses
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DatabaseStats {
            total_records: total as u64,
            pending_records: pending as u64,
            failed_records: failed as u64,
            synced_records: synced as u64,
        })
    }
}

/// Database statistics for one user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Every record owned by the user
    pub total_records: u64,
    /// Records still awaiting server confirmation
    pub pending_records: u64,
    /// Records whose last sync attempt failed
    pub failed_records: u64,
    /// Records confirmed by the server
    pub synced_records: u64,
}
