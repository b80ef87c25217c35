//! Error types for the popd-store crate.

use std::io;

use thiserror::Error;

use crate::MessageId;

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O operation failed (file read/delete, directory listing).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The user has no account in this store.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The message is not in the user's maildrop.
    #[error("Message not found: {0}")]
    NotFound(MessageId),

    /// A user name or message id that cannot be mapped safely onto storage.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Store directory validation failed.
    #[error("Store validation error: {0}")]
    Validation(String),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}
