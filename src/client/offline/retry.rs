//! # Retry Controller
//!
//! Per-user retry budget with exponential backoff for failed sync rounds.
//!
//! ## Features
//!
//! - **Exponential Backoff**: `min(base * 2^(n-1), max)` after the n-th failure
//! - **Attempt Cap**: after `max_attempts` failures no automatic retry is allowed
//!   until the state is reset by a successful round
//! - **Per-User State**: one user's failures never block another user's sync
//! - **Injectable Clock**: tests drive time with [`ManualClock`]
//!
//! State lives in memory only. A fresh process starts every user at zero so
//! that the first attempt after a restart is immediate.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use expense_sync::client::offline::retry::RetryController;
//! use expense_sync::shared::RetryPolicy;
//!
//! # async fn example() {
//! let retry = RetryController::new(RetryPolicy::default());
//!
//! if retry.can_retry("user-1").await {
//!     // run a sync round; on failure:
//!     retry.record_attempt("user-1").await;
//! }
//!
//! // Time left before the next automatic attempt
//! let wait = retry.time_until_next_retry("user-1").await;
//! # }
//! ```

use crate::shared::config::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Source of wall-clock time in epoch milliseconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start_millis`
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_millis(by), Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Retry bookkeeping for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    /// Failed attempts since the last success, capped at `max_attempts`
    pub attempt_count: u32,
    /// Epoch millis of the last failed attempt
    pub last_attempt_time: Option<i64>,
    /// Epoch millis before which no automatic retry is allowed;
    /// `None` before the first failure and once the budget is exhausted
    pub next_retry_time: Option<i64>,
}

/// Where a user sits in the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPhase {
    /// No failures recorded
    Idle,
    /// Waiting for `next_retry_time`
    BackingOff,
    /// A retry is permitted now
    Ready,
    /// Attempt cap reached; only a manual sync can recover
    Exhausted,
}

/// User-facing retry status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryNotice {
    /// Nothing has failed
    Idle,
    /// Another automatic attempt will happen
    WillRetry {
        /// Automatic attempts left in the budget
        attempts_remaining: u32,
        /// Time until the next attempt; zero when it is due now
        retry_in: Duration,
    },
    /// Automatic retries are used up
    Exhausted,
}

impl RetryNotice {
    /// Message for the user
    pub fn message(&self) -> String {
        match self {
            RetryNotice::Idle => "All changes are synced.".to_string(),
            RetryNotice::WillRetry {
                attempts_remaining,
                retry_in,
            } => format!(
                "Sync failed. Retrying automatically in {}s ({} attempt{} left).",
                retry_in.as_secs().max(1),
                attempts_remaining,
                if *attempts_remaining == 1 { "" } else { "s" }
            ),
            RetryNotice::Exhausted => {
                "Sync failed repeatedly. Tap sync to try again.".to_string()
            }
        }
    }
}

/// Retry controller shared by the dispatcher and the auto-sync trigger
#[derive(Debug)]
pub struct RetryController {
    /// Per-user retry state, created lazily
    states: RwLock<HashMap<String, RetryState>>,
    /// Backoff policy
    policy: RetryPolicy,
    /// Time source
    clock: Arc<dyn Clock>,
}

impl RetryController {
    /// Create a controller on the system clock
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a controller on a custom clock
    pub fn with_clock(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            policy,
            clock,
        }
    }

    /// Backoff policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether an automatic attempt is permitted right now
    pub async fn can_retry(&self, user_id: &str) -> bool {
        let state = self.get_retry_state(user_id).await;
        if state.attempt_count >= self.policy.max_attempts {
            return false;
        }
        match state.next_retry_time {
            Some(next) => self.clock.now_millis() >= next,
            None => true,
        }
    }

    /// Record one failed attempt and schedule the next one
    pub async fn record_attempt(&self, user_id: &str) -> RetryState {
        let now = self.clock.now_millis();
        let mut states = self.states.write().await;
        let state = states.entry(user_id.to_string()).or_default();

        state.attempt_count = (state.attempt_count + 1).min(self.policy.max_attempts);
        state.last_attempt_time = Some(now);
        state.next_retry_time = if state.attempt_count < self.policy.max_attempts {
            let delay = self.policy.delay_for_attempt(state.attempt_count);
            Some(now.saturating_add(duration_millis(delay)))
        } else {
            None
        };

        if state.next_retry_time.is_none() {
            tracing::warn!(
                user_id = %user_id,
                attempts = state.attempt_count,
                "Retry budget exhausted"
            );
        } else {
            tracing::debug!(
                user_id = %user_id,
                attempts = state.attempt_count,
                next_retry_time = ?state.next_retry_time,
                "Scheduled sync retry"
            );
        }

        *state
    }

    /// Forget every failure for `user_id`
    pub async fn reset_retry_state(&self, user_id: &str) {
        let mut states = self.states.write().await;
        if states.remove(user_id).is_some() {
            tracing::debug!(user_id = %user_id, "Reset retry state");
        }
    }

    /// Time until the next automatic attempt
    ///
    /// `None` when nothing is scheduled or the budget is exhausted.
    pub async fn time_until_next_retry(&self, user_id: &str) -> Option<Duration> {
        let state = self.get_retry_state(user_id).await;
        if state.attempt_count >= self.policy.max_attempts {
            return None;
        }
        let next = state.next_retry_time?;
        let remaining = next.saturating_sub(self.clock.now_millis()).max(0);
        Some(Duration::from_millis(remaining as u64))
    }

    /// Snapshot of the state for `user_id`
    pub async fn get_retry_state(&self, user_id: &str) -> RetryState {
        let states = self.states.read().await;
        states.get(user_id).copied().unwrap_or_default()
    }

    /// Current phase for `user_id`
    pub async fn phase(&self, user_id: &str) -> RetryPhase {
        let state = self.get_retry_state(user_id).await;
        if state.attempt_count == 0 {
            RetryPhase::Idle
        } else if state.attempt_count >= self.policy.max_attempts {
            RetryPhase::Exhausted
        } else {
            match state.next_retry_time {
                Some(next) if self.clock.now_millis() < next => RetryPhase::BackingOff,
                _ => RetryPhase::Ready,
            }
        }
    }

    /// What to tell the user about `user_id`'s retry status
    pub async fn notice(&self, user_id: &str) -> RetryNotice {
        let state = self.get_retry_state(user_id).await;
        if state.attempt_count == 0 {
            return RetryNotice::Idle;
        }
        if state.attempt_count >= self.policy.max_attempts {
            return RetryNotice::Exhausted;
        }
        RetryNotice::WillRetry {
            attempts_remaining: self.policy.max_attempts - state.attempt_count,
            retry_in: self
                .time_until_next_retry(user_id)
                .await
                .unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
