//! Local store integration tests

use crate::common::*;
use assert_matches::assert_matches;
use expense_sync::client::LocalDatabase;
use expense_sync::shared::{ErrorKind, ExpensePatch, NewExpense, StoreError, SyncStatus};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn remap_replaces_old_id_in_every_view() {
    let store = create_test_store().await;
    let record = seed_expense(&store, USER, 8.0).await;

    store
        .update_expense(&record.id, ExpensePatch::confirmed("srv-42"))
        .await
        .unwrap();

    let ids: Vec<String> = store
        .get_all_expenses(USER)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["srv-42".to_string()]);
    assert!(store.get_expense(&record.id).await.unwrap().is_none());
    assert!(store.get_pending_sync(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn payload_passes_through_unchanged() {
    let store = create_test_store().await;
    let record = store
        .create_expense(NewExpense::offline(USER, 19.99, Some("naïve café ☕".into()), "2024-02-29"))
        .await
        .unwrap();

    let stored = store.get_expense(&record.id).await.unwrap().unwrap();
    assert_approx_eq!(stored.amount, 19.99, 1e-9);
    assert_eq!(stored.note.as_deref(), Some("naïve café ☕"));
    assert_eq!(stored.date, "2024-02-29");
    assert_eq!(stored.created_at, record.created_at);
}

#[tokio::test]
async fn update_of_missing_id_is_not_found() {
    let store = create_test_store().await;
    let result = store.update_expense("ghost", ExpensePatch::confirmed("srv-1")).await;

    assert_matches!(&result, Err(StoreError::NotFound { id }) if id == "ghost");
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn stats_count_each_status() {
    let store = create_test_store().await;
    let a = seed_expense(&store, USER, 1.0).await;
    let b = seed_expense(&store, USER, 2.0).await;
    seed_expense(&store, USER, 3.0).await;
    seed_expense(&store, "someone-else", 4.0).await;

    store.update_expense(&a.id, ExpensePatch::confirmed("srv-a")).await.unwrap();
    store.update_expense(&b.id, ExpensePatch::failed()).await.unwrap();

    let stats = store.get_stats(USER).await.unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.pending_records, 2);
    assert_eq!(stats.failed_records, 1);
    assert_eq!(stats.synced_records, 1);
}

#[tokio::test]
async fn records_survive_reopen() {
    let fixture = TestDatabase::new().await;
    let record = seed_expense(&fixture.store, USER, 5.0).await;
    fixture.store.close().await;

    let reopened = assert_ok!(
        LocalDatabase::open(fixture.path(), None).await,
        "reopening an up-to-date store"
    );
    let pending = assert_ok!(reopened.get_pending_sync(USER).await);
    assert_eq!(pending, vec![record]);
    assert_eq!(pending[0].sync_status, SyncStatus::Pending);
}

#[tokio::test]
async fn quota_exceeded_is_not_io() {
    let store = LocalDatabase::in_memory_with_quota(Some(16)).await.unwrap();
    let note = "x".repeat(4_000);

    let mut error = None;
    for _ in 0..200 {
        if let Err(e) = store
            .create_expense(NewExpense::offline(USER, 1.0, Some(note.clone()), "2024-03-01"))
            .await
        {
            error = Some(e);
            break;
        }
    }

    let error = error.expect("store never filled up");
    assert_matches!(error, StoreError::QuotaExceeded { .. });
    assert_eq!(error.kind(), ErrorKind::QuotaExceeded);
    assert!(!error.kind().is_retryable());

    // Earlier writes are still readable
    assert!(!store.get_all_expenses(USER).await.unwrap().is_empty());
}
