//! Error types for the vote and donation ledger

use crate::types::{TargetRef, UserId};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed argument (polarity, amount, self-donation, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vote target not registered
    #[error("Vote target not found: {0}")]
    TargetNotFound(TargetRef),

    /// Account not registered
    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    /// Atomic write unit could not complete (lock timeout, deadlock, busy)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Invariant violation (counter drift, balance drift)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (blocking task panicked or was cancelled)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification the routing layer maps to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied a bad argument
    InvalidInput,
    /// Referenced target or account does not exist
    NotFound,
    /// Store contention; the caller may retry
    ConflictOrTransient,
    /// Anything else
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::TargetNotFound(_) | Error::AccountNotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::ConflictOrTransient,
            _ => ErrorKind::Internal,
        }
    }

    /// Whether the caller should retry the whole operation
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConflictOrTransient
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        use rocksdb::ErrorKind as Rocks;

        match err.kind() {
            Rocks::Busy | Rocks::TimedOut | Rocks::TryAgain => Error::Conflict(err.to_string()),
            _ => Error::Storage(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Concurrency(err.to_string())
    }
}
