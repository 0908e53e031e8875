//! Expense Sync - Main Library
//!
//! Offline-first synchronization core for a personal expense tracker.
//! Expenses written while offline are kept in a local SQLite store under a
//! temporary id and sent to the server in one batch once connectivity
//! returns. The server's id mappings are written back and failures are
//! retried with bounded exponential backoff.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared with the server
//!   - Expense record, patch and sync status
//!   - `/sync` request and response bodies
//!   - Error taxonomy and configuration
//!
//! - **`client`** - The on-device sync core
//!   - Durable local store with migrations and quota detection
//!   - Retry controller with per-user backoff state
//!   - Sync dispatcher with a single-flight guard per user
//!   - Auto-sync scheduler driven by connectivity transitions
//!
//! # Feature Flags
//!
//! - **`logging`** (default) - `client::logging::init_tracing`, a
//!   `tracing-subscriber` setup honoring `RUST_LOG`
//!
//! # Usage
//!
//! ```rust,no_run
//! use expense_sync::client::{Config, SyncService};
//! use expense_sync::shared::NewExpense;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = SyncService::new(Config::new()).await?;
//! service
//!     .store()
//!     .create_expense(NewExpense::offline("user-1", 12.0, Some("taxi".into()), "2024-03-01"))
//!     .await?;
//!
//! let _auto = service.auto_sync("user-1");
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - Store operations return [`shared::StoreError`]
//! - Sync rounds never return errors; they return a
//!   [`client::SyncOutcome`] carrying an [`shared::ErrorKind`]

/// Shared types and data structures
pub mod shared;

/// On-device sync core
pub mod client;
