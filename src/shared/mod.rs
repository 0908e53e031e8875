//! Shared Module
//!
//! Types shared between the on-device sync core and the server it talks to:
//! the expense record, the `/sync` wire format, errors and configuration.
//!
//! # Overview
//!
//! Nothing in this module touches storage or the network. Everything here is
//! plain data designed for serialization.

/// Expense record and patch types
pub mod expense;

/// `/sync` request and response bodies
pub mod sync_protocol;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError, RetryPolicy};
pub use error::{ErrorKind, StoreError, SyncError};
pub use expense::{ExpensePatch, ExpenseRecord, NewExpense, SyncStatus};
pub use sync_protocol::{IdMapping, SyncItem, SyncResponse};
