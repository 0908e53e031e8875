//! # Offline Support
//!
//! Retry budgeting and reconciliation of sync results into the local store.
//!
//! ## Key Components
//!
//! - `retry.rs`: per-user retry state with exponential backoff
//! - `reconciliation.rs`: applies server id mappings and failure marks

pub mod reconciliation;
pub mod retry;

pub use reconciliation::{ReconciliationError, ReconciliationReport, Reconciler};
pub use retry::{
    Clock, ManualClock, RetryController, RetryNotice, RetryPhase, RetryState, SystemClock,
};
