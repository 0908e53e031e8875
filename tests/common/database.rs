//! Local store fixtures
//!
//! Helpers for opening throwaway stores and seeding them with records.

use expense_sync::client::LocalDatabase;
use expense_sync::shared::{ExpensePatch, ExpenseRecord, NewExpense};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a fresh in-memory store
pub async fn create_test_store() -> Arc<LocalDatabase> {
    Arc::new(
        LocalDatabase::in_memory()
            .await
            .expect("Failed to open in-memory store"),
    )
}

/// Store an offline expense for `user_id`
pub async fn seed_expense(store: &LocalDatabase, user_id: &str, amount: f64) -> ExpenseRecord {
    store
        .create_expense(NewExpense::offline(
            user_id,
            amount,
            Some(format!("expense {}", amount)),
            "2024-03-01",
        ))
        .await
        .expect("Failed to seed expense")
}

/// Store an offline expense and rename it to a known temp id
pub async fn seed_with_id(store: &LocalDatabase, user_id: &str, id: &str) -> ExpenseRecord {
    let record = seed_expense(store, user_id, 1.0).await;
    store
        .update_expense(
            &record.id,
            ExpensePatch {
                id: Some(id.to_string()),
                ..ExpensePatch::default()
            },
        )
        .await
        .expect("Failed to rename seeded expense")
}

/// On-disk store that lives as long as the fixture
pub struct TestDatabase {
    pub store: Arc<LocalDatabase>,
    pub dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = LocalDatabase::open(dir.path().join("expenses.db"), None)
            .await
            .expect("Failed to open store");
        Self {
            store: Arc::new(store),
            dir,
        }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("expenses.db")
    }
}
