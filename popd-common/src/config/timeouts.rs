//! Timeout configuration for POP3 sessions.
//!
//! RFC 1939 Section 3 requires that an inactivity autologout timer, if
//! present, be at least 10 minutes long. The command timeout defaults to
//! exactly that; the connection timeout caps the total lifetime of one
//! session regardless of activity.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server-side POP3 timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTimeouts {
    /// Time allowed between two command lines.
    ///
    /// Default: 600 seconds (10 minutes, per RFC 1939)
    #[serde(default = "defaults::command_secs")]
    pub command_secs: u64,

    /// Maximum total connection duration.
    ///
    /// Default: 3600 seconds (1 hour)
    #[serde(default = "defaults::connection_secs")]
    pub connection_secs: u64,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            command_secs: defaults::command_secs(),
            connection_secs: defaults::connection_secs(),
        }
    }
}

impl ServerTimeouts {
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_secs)
    }
}

mod defaults {
    pub const fn command_secs() -> u64 {
        600 // 10 minutes
    }
    pub const fn connection_secs() -> u64 {
        3600 // 1 hour
    }
}
