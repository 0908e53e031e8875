//! Sync dispatcher integration tests against a mock `/sync` endpoint

use crate::common::*;
use expense_sync::client::{RetryPhase, RetryState, SyncOutcome};
use expense_sync::shared::{ErrorKind, SyncStatus};
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn empty_queue_issues_no_request() {
    let harness = SyncHarness::new().await;
    mount_sync_echo(&harness.server).await;

    let outcome = harness.service.sync_now(USER).await;

    assert_eq!(outcome, SyncOutcome::succeeded(0));
    assert_eq!(request_count(&harness.server).await, 0);
}

#[tokio::test]
async fn full_success_round_trip() {
    let harness = SyncHarness::new().await;
    let store = harness.service.store();
    seed_with_id(store, USER, "temp-a").await;
    seed_with_id(store, USER, "temp-b").await;
    harness.service.retry().record_attempt(USER).await;
    harness.advance(Duration::from_secs(5));

    mount_sync_success(&harness.server, &[("temp-a", "srv-1"), ("temp-b", "srv-2")]).await;

    let outcome = harness.service.sync_now(USER).await;
    assert_eq!(outcome, SyncOutcome::succeeded(2));
    assert_eq!(request_count(&harness.server).await, 1);

    let mut records = store.get_all_expenses(USER).await.unwrap();
    records.sort_by(|a, b| a.id.cmp(&b.id));
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["srv-1", "srv-2"]);
    for record in &records {
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert!(!record.pending_sync);
        assert!(!record.local_only);
    }

    assert_eq!(harness.service.retry().get_retry_state(USER).await, RetryState::default());
    assert!(store.get_last_sync_time(USER).await.unwrap().is_some());
}

#[tokio::test]
async fn batch_body_matches_wire_format() {
    let harness = SyncHarness::new().await;
    let record = seed_with_id(harness.service.store(), USER, "temp-a").await;

    Mock::given(method("POST"))
        .and(path("/sync"))
        .and(body_json(serde_json::json!([{
            "tempId": "temp-a",
            "amount": 1.0,
            "note": "expense 1",
            "date": "2024-03-01",
            "createdAt": record.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }])))
        .respond_with(EchoSync)
        .expect(1)
        .mount(&harness.server)
        .await;

    let outcome = harness.service.sync_now(USER).await;
    assert!(outcome.success, "{:?}", outcome);
}

#[tokio::test]
async fn network_failure_then_recovery() {
    let harness = SyncHarness::new().await;
    let store = harness.service.store();
    seed_with_id(store, USER, "temp-a").await;
    seed_with_id(store, USER, "temp-b").await;

    mount_sync_timeout(&harness.server, 1).await;
    mount_sync_echo(&harness.server).await;

    let outcome = harness.service.sync_now(USER).await;
    assert_sync_failed!(outcome, ErrorKind::Network);

    for record in store.get_all_expenses(USER).await.unwrap() {
        assert_eq!(record.sync_status, SyncStatus::Failed);
        assert!(record.pending_sync);
    }

    let retry = harness.service.retry();
    let state = retry.get_retry_state(USER).await;
    assert_eq!(state.attempt_count, 1);
    assert_eq!(state.next_retry_time, Some(CLOCK_START + 5_000));
    assert!(!retry.can_retry(USER).await);
    assert_eq!(retry.phase(USER).await, RetryPhase::BackingOff);

    harness.advance(Duration::from_millis(5_000));
    assert!(retry.can_retry(USER).await);

    let outcome = harness.service.sync_now(USER).await;
    assert_eq!(outcome, SyncOutcome::succeeded(2));
    assert_eq!(retry.get_retry_state(USER).await, RetryState::default());

    let ids: Vec<String> = store
        .get_all_expenses(USER)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert!(ids.contains(&"srv-temp-a".to_string()));
    assert!(ids.contains(&"srv-temp-b".to_string()));
}

#[tokio::test]
async fn server_errors_are_classified() {
    let cases = [
        (400, ErrorKind::Validation),
        (401, ErrorKind::Server),
        (502, ErrorKind::Server),
        (418, ErrorKind::Unknown),
    ];

    for (status, kind) in cases {
        let harness = SyncHarness::new().await;
        seed_expense(harness.service.store(), USER, 1.0).await;
        mount_sync_status(&harness.server, status, 1).await;

        let outcome = harness.service.sync_now(USER).await;
        assert_sync_failed!(outcome, kind);
        assert_contains!(outcome.error.clone().unwrap_or_default(), "rejected");
    }
}

#[tokio::test]
async fn malformed_success_body_is_unknown_and_retryable() {
    let harness = SyncHarness::new().await;
    seed_expense(harness.service.store(), USER, 1.0).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {}
        })))
        .mount(&harness.server)
        .await;

    let outcome = harness.service.sync_now(USER).await;
    assert_sync_failed!(outcome, ErrorKind::Unknown);
    assert_eq!(harness.service.retry().get_retry_state(USER).await.attempt_count, 1);
}

#[tokio::test]
async fn unmapped_records_stay_pending() {
    let harness = SyncHarness::new().await;
    let store = harness.service.store();
    seed_with_id(store, USER, "temp-a").await;
    seed_with_id(store, USER, "temp-b").await;
    mount_sync_success(&harness.server, &[("temp-a", "srv-1"), ("temp-zzz", "srv-9")]).await;

    let outcome = harness.service.sync_now(USER).await;
    assert_eq!(outcome, SyncOutcome::succeeded(1));

    let pending = store.get_pending_sync(USER).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "temp-b");
    assert!(store.get_expense("srv-9").await.unwrap().is_none());
    assert_eq!(pending[0].sync_status, SyncStatus::Pending);
    assert_eq!(harness.service.retry().get_retry_state(USER).await, RetryState::default());
}

#[tokio::test]
async fn concurrent_syncs_share_one_request() {
    let harness = SyncHarness::new().await;
    seed_expense(harness.service.store(), USER, 1.0).await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(EchoSync)
        .mount(&harness.server)
        .await;

    let dispatcher = harness.service.dispatcher();
    let (a, b, c) = tokio::join!(
        dispatcher.sync(USER),
        dispatcher.sync(USER),
        harness.service.sync_now(USER)
    );

    assert_eq!(a, SyncOutcome::succeeded(1));
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(request_count(&harness.server).await, 1);
}

#[tokio::test]
async fn other_users_are_untouched() {
    let harness = SyncHarness::new().await;
    let store = harness.service.store();
    seed_expense(store, USER, 1.0).await;
    let other = seed_expense(store, "user-2", 2.0).await;
    mount_sync_echo(&harness.server).await;

    let outcome = harness.service.sync_now(USER).await;
    assert_eq!(outcome.synced_count, 1);

    let untouched = store.get_expense(&other.id).await.unwrap().unwrap();
    assert!(untouched.pending_sync);
    assert_eq!(untouched.sync_status, SyncStatus::Pending);
    assert_eq!(harness.service.retry().phase("user-2").await, RetryPhase::Idle);
}

#[tokio::test]
async fn metrics_track_rounds() {
    let harness = SyncHarness::new().await;
    seed_expense(harness.service.store(), USER, 1.0).await;
    mount_sync_status(&harness.server, 500, 1).await;
    mount_sync_echo(&harness.server).await;

    harness.service.sync_now(USER).await;
    harness.service.sync_now(USER).await;
    harness.service.sync_now(USER).await;

    let metrics = harness.service.metrics().await;
    assert_eq!(metrics.total_syncs, 3);
    assert_eq!(metrics.failed_syncs, 1);
    assert_eq!(metrics.successful_syncs, 2);
    assert_eq!(metrics.empty_syncs, 1);
    assert_eq!(metrics.records_synced, 1);
    assert_in_range!(metrics.success_rate(), 0.66, 0.67);
}
