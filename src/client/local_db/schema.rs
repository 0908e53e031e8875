//! Database Schema Definitions
//!
//! Schema constants and the ordered list of migrations. Every statement uses
//! create-if-absent semantics so that re-running a migration is harmless.

/// Logical database name; also the default file stem
pub const DATABASE_NAME: &str = "expense_sync";

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Bookkeeping table for applied migrations
pub const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)";

/// Version 1: expense collection, its three indexes, and sync metadata
const MIGRATION_1: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS expenses (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        amount REAL NOT NULL,
        note TEXT,
        date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        pending_sync INTEGER NOT NULL DEFAULT 1,
        sync_status TEXT NOT NULL DEFAULT 'pending'
            CHECK (sync_status IN ('pending', 'synced', 'failed')),
        local_only INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_expenses_user_id ON expenses(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_pending_sync ON expenses(pending_sync)",
    "CREATE TABLE IF NOT EXISTS sync_metadata (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
];

/// Schema migration versions with their statements, in order
pub const MIGRATIONS: &[(i32, &[&str])] = &[(1, MIGRATION_1)];

/// Check if database needs migration
pub fn needs_migration(current_version: i32) -> bool {
    current_version < CURRENT_SCHEMA_VERSION
}

/// Get pending migrations
pub fn get_pending_migrations(current_version: i32) -> Vec<(i32, &'static [&'static str])> {
    MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > current_version)
        .copied()
        .collect()
}
