//! Error types for the popd-pop3 session engine.

use std::io;

use thiserror::Error;

/// Errors that can occur while reading from or writing to the client.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// I/O error during connection operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from operations on a session's mailbox view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewError {
    /// Position is out of range, or the message is marked deleted.
    #[error("No such message: {0}")]
    NoSuchMessage(usize),
}

/// Specialized `Result` type for connection operations.
pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;

impl From<ConnectionError> for popd_common::error::SessionError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Io(err) => Self::Connection(err),
        }
    }
}
