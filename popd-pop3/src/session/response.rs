use core::fmt::{self, Display, Formatter};
use std::borrow::Cow;

/// Status indicator that opens every POP3 response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "+OK",
            Self::Err => "-ERR",
        })
    }
}

/// First line of a response: status indicator plus optional text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    status: Status,
    text: Cow<'static, str>,
}

impl Reply {
    pub fn ok(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status: Status::Ok,
            text: text.into(),
        }
    }

    pub fn err(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status: Status::Err,
            text: text.into(),
        }
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} {}", self.status, self.text)
        }
    }
}

/// Fixed response texts
pub mod text {
    pub const USER_ACCEPTED: &str = "User is valid, proceed with password";
    pub const NO_SUCH_USER: &str = "No such user";
    pub const PASS_ACCEPTED: &str = "Password is valid, mail loaded";
    pub const INVALID_PASSWORD: &str = "Invalid password";
    pub const MAILDROP_LOCKED: &str = "Unable to lock maildrop";
    pub const SYNTAX_ARGUMENTS: &str = "Syntax error in parameters or arguments";
    pub const BAD_SEQUENCE: &str = "Bad sequence of commands";
    pub const NO_SUCH_MESSAGE: &str = "no such message";
    pub const NOT_IMPLEMENTED: &str = "Command not implemented";
    pub const UNRECOGNIZED: &str = "Syntax error, command unrecognized";
    pub const BLANK: &str = "Syntax error, blank command unrecognized";
    pub const CLOSING: &str = "Service closing transmission channel";
    pub const NOT_REMOVED: &str = "Some deleted messages not removed";
    pub const SHUTTING_DOWN: &str = "Server shutting down";
}
