use core::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::command::Verb;

/// Phase of a POP3 session (RFC 1939 Section 3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Greeting sent, waiting for USER
    #[default]
    Authorization,
    /// USER accepted, waiting for PASS
    AuthorizationPass,
    /// Authenticated with a loaded maildrop
    Transaction,
    /// QUIT received; the session is over
    Update,
}

impl State {
    /// Whether `verb` may be issued in this phase
    ///
    /// QUIT is accepted everywhere but [`State::Update`]. TOP, UIDL and APOP
    /// are never admitted; they are answered as not implemented.
    #[must_use]
    pub const fn admits(self, verb: Verb) -> bool {
        match verb {
            Verb::Quit => !self.is_terminal(),
            Verb::User => matches!(self, Self::Authorization),
            Verb::Pass => matches!(self, Self::AuthorizationPass),
            Verb::Stat
            | Verb::List
            | Verb::Retr
            | Verb::Dele
            | Verb::Rset
            | Verb::Noop => matches!(self, Self::Transaction),
            Verb::Top | Verb::Uidl | Verb::Apop => false,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Update)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authorization => "AUTHORIZATION",
            Self::AuthorizationPass => "AUTHORIZATION_PASS",
            Self::Transaction => "TRANSACTION",
            Self::Update => "UPDATE",
        })
    }
}
