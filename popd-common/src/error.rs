//! Error types for the popd-common crate.
//!
//! This module provides foundational error types used across the protocol,
//! session, listener and controller layers of popd.

use std::io;

use thiserror::Error;

/// Errors that can occur during protocol validation.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A required configuration field is missing.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A configuration value is invalid.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },
}

/// Errors that end a session.
///
/// Anything the client did wrong at the protocol level is answered with
/// `-ERR` and never becomes a `SessionError`; these are the fatal cases.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Protocol error occurred during session.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection error occurred.
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// Session timed out.
    #[error("Session timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors that can occur in the controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Protocol validation failed.
    #[error("Protocol validation failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// A listener error occurred.
    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),

    /// No listeners were configured.
    #[error("No listeners configured for {0}")]
    NoListeners(&'static str),
}

/// Errors that can occur in the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to socket address.
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("Failed to accept connection: {0}")]
    AcceptFailed(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::MissingField("store");
        assert_eq!(err.to_string(), "Missing required field: store");

        let err = ProtocolError::InvalidConfiguration {
            field: "banner".to_string(),
            reason: "must not contain CR or LF".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration for banner: must not contain CR or LF"
        );
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Protocol("Command line too long".to_string());
        assert_eq!(err.to_string(), "Protocol error: Command line too long");

        let err = SessionError::Timeout(600);
        assert_eq!(err.to_string(), "Session timed out after 600 seconds");

        let err = SessionError::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(err, SessionError::Connection(_)));
    }

    #[test]
    fn test_error_source_chain() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let bind_err = ListenerError::BindFailed {
            address: "0.0.0.0:110".to_string(),
            source: io_err,
        };

        assert!(bind_err.source().is_some());
        assert_eq!(
            bind_err.to_string(),
            "Failed to bind to 0.0.0.0:110: access denied"
        );

        let err = ControllerError::from(bind_err);
        assert!(matches!(err, ControllerError::Listener(_)));
    }
}
