//! Shared Error Types
//!
//! Error types surfaced by the local store and the sync round.
//!
//! # Error Categories
//!
//! - `StoreError` - local durable store failures (quota, missing ids, I/O)
//! - `SyncError` - failures of one reconciliation round against the server
//! - `ErrorKind` - the flat taxonomy carried in a `SyncOutcome` and used to
//!   pick the user-facing message
//!
//! # Usage
//!
//! ```rust
//! use expense_sync::shared::error::{ErrorKind, StoreError};
//!
//! let error = StoreError::not_found("temp-1");
//! assert_eq!(error.kind(), ErrorKind::NotFound);
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync + Clone` so a single round's failure can
//! be handed to every caller waiting on that round.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SQLite primary result code for "database or disk is full".
const SQLITE_FULL: i32 = 13;
/// SQLite primary result code for disk I/O failures.
const SQLITE_IOERR: i32 = 10;

/// Flat error taxonomy shared by the store and the sync round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Device storage is full
    QuotaExceeded,
    /// An update or remap referenced an id that is not in the store
    NotFound,
    /// No response was received from the server
    Network,
    /// The server rejected the payload
    Validation,
    /// The server failed or the session expired
    Server,
    /// Anything else, including malformed success responses
    Unknown,
}

impl ErrorKind {
    /// Whether the automatic backoff path applies to this kind
    ///
    /// Validation failures go through the same backoff as network failures.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::QuotaExceeded | ErrorKind::NotFound)
    }

    /// Short message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::QuotaExceeded => {
                "Device storage is full. Free up space to keep saving expenses offline."
            }
            ErrorKind::NotFound => "A local expense could not be found.",
            ErrorKind::Network => "You appear to be offline. Changes are saved locally.",
            ErrorKind::Validation => "The server rejected some expenses.",
            ErrorKind::Server => "The server is having trouble. Please try again later.",
            ErrorKind::Unknown => "Sync failed for an unknown reason.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors raised by the local durable store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying storage is full
    #[error("Storage quota exceeded: {message}")]
    QuotaExceeded {
        /// Message reported by the storage engine
        message: String,
    },

    /// No record exists under the given id
    #[error("Expense not found: {id}")]
    NotFound {
        /// The id that was looked up
        id: String,
    },

    /// A remap targeted an id that is already taken
    #[error("Expense already exists: {id}")]
    AlreadyExists {
        /// The conflicting id
        id: String,
    },

    /// Disk I/O failure
    #[error("Storage I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
    },

    /// Any other database engine failure
    #[error("Database error: {message}")]
    Database {
        /// Human-readable error message
        message: String,
    },

    /// The on-disk schema cannot be opened by this version
    #[error("Migration error: {message}")]
    Migration {
        /// Human-readable error message
        message: String,
    },

    /// A stored value could not be decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },
}

impl StoreError {
    /// Create a new not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new already-exists error
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Create a new migration error
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Map onto the flat taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::Unknown,
        }
    }

    /// True when device storage is full
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                let primary = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);
                match primary {
                    Some(SQLITE_FULL) => StoreError::QuotaExceeded {
                        message: db_err.message().to_string(),
                    },
                    Some(SQLITE_IOERR) => StoreError::Io {
                        message: db_err.message().to_string(),
                    },
                    _ => StoreError::Database {
                        message: db_err.message().to_string(),
                    },
                }
            }
            sqlx::Error::Io(io_err) => StoreError::Io {
                message: io_err.to_string(),
            },
            _ => StoreError::Database {
                message: err.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Errors raised by one reconciliation round
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No response was received (offline, timeout, DNS)
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The server rejected the payload
    #[error("Validation error ({status}): {message}")]
    Validation {
        /// HTTP status code
        status: u16,
        /// Message returned by the server
        message: String,
    },

    /// Server-side failure or expired session
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Message returned by the server
        message: String,
    },

    /// Anything else
    #[error("Sync error: {message}")]
    Unknown {
        /// Human-readable error message
        message: String,
    },

    /// The local store failed while reading or applying the batch
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Classify a non-2xx HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Self::Validation { status, message },
            401 | 500..=599 => Self::Server { status, message },
            _ => Self::Unknown {
                message: format!("unexpected status {}: {}", status, message),
            },
        }
    }

    /// Map onto the flat taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Network { .. } => ErrorKind::Network,
            SyncError::Validation { .. } => ErrorKind::Validation,
            SyncError::Server { .. } => ErrorKind::Server,
            SyncError::Unknown { .. } => ErrorKind::Unknown,
            SyncError::Store(store) => store.kind(),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::unknown(format!("malformed response: {}", err))
    }
}
