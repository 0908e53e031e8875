//! Client Module
//!
//! The on-device half of expense sync: the durable local store, retry
//! budgeting, and the sync service that moves pending records to the server.

/// Local SQLite store
pub mod local_db;

/// Retry controller and reconciliation
pub mod offline;

/// Dispatcher, scheduler and connectivity
pub mod sync;

/// Client configuration
pub mod config;

/// Tracing setup
pub mod logging;

pub use config::Config;
pub use local_db::LocalDatabase;
pub use offline::{RetryController, RetryNotice, RetryPhase, RetryState};
pub use sync::{
    AutoSyncHandle, AutoSyncTrigger, ConnectivityEvent, ConnectivityObserver, SyncApi,
    SyncDispatcher, SyncOutcome, SyncService,
};
