//! # Sync Metrics
//!
//! Counters for sync rounds: how many ran, how they ended, how long they took.

use crate::shared::error::ErrorKind;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetrics {
    /// Rounds that reached the server or short-circuited on an empty queue
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    /// Rounds that found nothing pending
    pub empty_syncs: u64,
    /// Records confirmed by the server
    pub records_synced: u64,
    pub average_sync_duration: Duration,
    pub last_sync_duration: Option<Duration>,
    pub failures_by_kind: HashMap<ErrorKind, u64>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_empty(&mut self) {
        self.total_syncs += 1;
        self.successful_syncs += 1;
        self.empty_syncs += 1;
    }

    pub fn record_success(&mut self, records: usize, duration: Duration) {
        self.total_syncs += 1;
        self.successful_syncs += 1;
        self.records_synced += records as u64;
        self.record_duration(duration);
    }

    pub fn record_failure(&mut self, kind: ErrorKind, duration: Duration) {
        self.total_syncs += 1;
        self.failed_syncs += 1;
        *self.failures_by_kind.entry(kind).or_insert(0) += 1;
        self.record_duration(duration);
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_syncs == 0 {
            0.0
        } else {
            self.successful_syncs as f64 / self.total_syncs as f64
        }
    }

    fn record_duration(&mut self, duration: Duration) {
        let timed = (self.total_syncs - self.empty_syncs) as u32;
        self.last_sync_duration = Some(duration);
        // Rolling average over rounds that reached the server
        let total = self.average_sync_duration * timed.saturating_sub(1) + duration;
        self.average_sync_duration = total / timed.max(1);
    }
}
