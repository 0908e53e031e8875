//! Property-based tests for backoff and the retry controller
//!
//! Uses proptest to generate random policies and failure sequences

use expense_sync::client::offline::retry::{ManualClock, RetryController, RetryState};
use expense_sync::shared::RetryPolicy;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn policy_strategy() -> impl Strategy<Value = RetryPolicy> {
    (1u64..10_000, 1u64..8, 1u32..8).prop_map(|(base, factor, max_attempts)| RetryPolicy {
        base_delay: Duration::from_millis(base),
        max_delay: Duration::from_millis(base * factor),
        max_attempts,
    })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_backoff_doubles_until_capped(policy in policy_strategy(), attempt in 1u32..64) {
        let current = policy.delay_for_attempt(attempt);
        let next = policy.delay_for_attempt(attempt + 1);

        prop_assert_eq!(next, (current * 2).min(policy.max_delay));
        prop_assert!(current <= policy.max_delay);
        prop_assert!(current >= policy.base_delay.min(policy.max_delay));
    }

    #[test]
    fn test_default_curve_is_capped(attempt in 4u32..1_000) {
        let policy = RetryPolicy::default();
        prop_assert_eq!(policy.delay_for_attempt(attempt), Duration::from_millis(30_000));
    }

    #[test]
    fn test_exhaustion_after_max_attempts(
        policy in policy_strategy(),
        extra in 0u32..5,
        wait_ms in 0u64..1_000_000,
    ) {
        let rt = runtime();
        rt.block_on(async {
            let clock = Arc::new(ManualClock::new(0));
            let retry = RetryController::with_clock(policy, clock.clone());

            for _ in 0..policy.max_attempts + extra {
                retry.record_attempt("user").await;
            }
            clock.advance(Duration::from_millis(wait_ms));

            let state = retry.get_retry_state("user").await;
            prop_assert_eq!(state.attempt_count, policy.max_attempts);
            prop_assert_eq!(state.next_retry_time, None);
            prop_assert!(!retry.can_retry("user").await);
            prop_assert_eq!(retry.time_until_next_retry("user").await, None);
            Ok(())
        })?;
    }

    #[test]
    fn test_reset_always_yields_zero_state(policy in policy_strategy(), failures in 0u32..10) {
        let rt = runtime();
        rt.block_on(async {
            let retry = RetryController::with_clock(policy, Arc::new(ManualClock::new(1_000)));
            for _ in 0..failures {
                retry.record_attempt("user").await;
            }

            retry.reset_retry_state("user").await;
            prop_assert_eq!(retry.get_retry_state("user").await, RetryState::default());
            prop_assert!(retry.can_retry("user").await);
            Ok(())
        })?;
    }

    #[test]
    fn test_can_retry_exactly_when_delay_elapsed(
        policy in policy_strategy(),
        failures in 1u32..8,
        wait_ms in 0u64..100_000,
    ) {
        prop_assume!(failures < policy.max_attempts);
        let rt = runtime();
        rt.block_on(async {
            let clock = Arc::new(ManualClock::new(0));
            let retry = RetryController::with_clock(policy, clock.clone());
            for _ in 0..failures {
                retry.record_attempt("user").await;
            }
            clock.advance(Duration::from_millis(wait_ms));

            let delay = policy.delay_for_attempt(failures).as_millis() as u64;
            prop_assert_eq!(retry.can_retry("user").await, wait_ms >= delay);
            prop_assert_eq!(
                retry.time_until_next_retry("user").await,
                Some(Duration::from_millis(delay.saturating_sub(wait_ms)))
            );
            Ok(())
        })?;
    }
}
