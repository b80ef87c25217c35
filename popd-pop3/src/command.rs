use core::fmt::{self, Display, Formatter};

use phf::phf_map;
use thiserror::Error;

/// Every command name the server recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    User,
    Pass,
    Stat,
    List,
    Retr,
    Dele,
    Rset,
    Noop,
    Quit,
    Top,
    Uidl,
    Apop,
}

/// Perfect hash map of command names for O(1) lookup
static VERBS: phf::Map<&'static str, Verb> = phf_map! {
    "USER" => Verb::User,
    "PASS" => Verb::Pass,
    "STAT" => Verb::Stat,
    "LIST" => Verb::List,
    "RETR" => Verb::Retr,
    "DELE" => Verb::Dele,
    "RSET" => Verb::Rset,
    "NOOP" => Verb::Noop,
    "QUIT" => Verb::Quit,
    "TOP" => Verb::Top,
    "UIDL" => Verb::Uidl,
    "APOP" => Verb::Apop,
};

/// Longest command name in [`VERBS`]
const MAX_VERB_LEN: usize = 4;

impl Verb {
    /// Look up a command name, ignoring case
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        if name.len() > MAX_VERB_LEN {
            return None;
        }

        VERBS.get(name.to_ascii_uppercase().as_str()).copied()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Pass => "PASS",
            Self::Stat => "STAT",
            Self::List => "LIST",
            Self::Retr => "RETR",
            Self::Dele => "DELE",
            Self::Rset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
            Self::Top => "TOP",
            Self::Uidl => "UIDL",
            Self::Apop => "APOP",
        }
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a line could not be turned into a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing but whitespace
    #[error("Blank command")]
    Blank,

    /// The first token is not a known command name
    #[error("Unrecognized command: {0}")]
    Unrecognized(String),
}

/// A tokenized command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    args: Vec<String>,
    /// The line after the command name, inner whitespace untouched
    rest: String,
}

impl Command {
    #[must_use]
    pub fn new(verb: Verb, args: Vec<String>) -> Self {
        let rest = args.join(" ");
        Self { verb, args, rest }
    }

    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// Positional argument `idx`, counting from 0 after the command name
    #[must_use]
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Everything after the command name and its separator, without the
    /// line terminator
    #[must_use]
    pub fn rest(&self) -> &str {
        &self.rest
    }
}

impl TryFrom<&str> for Command {
    type Error = ParseError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let line = line.trim_start_matches(|c: char| c.is_ascii_whitespace());
        if line.is_empty() {
            return Err(ParseError::Blank);
        }

        let (name, rest) = line
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((line, ""));
        let verb =
            Verb::lookup(name).ok_or_else(|| ParseError::Unrecognized(name.to_string()))?;

        let rest = rest
            .trim_start_matches(|c: char| c.is_ascii_whitespace())
            .trim_end_matches(['\r', '\n']);

        Ok(Self {
            verb,
            args: rest.split_ascii_whitespace().map(str::to_string).collect(),
            rest: rest.to_string(),
        })
    }
}

impl TryFrom<&[u8]> for Command {
    type Error = ParseError;

    fn try_from(line: &[u8]) -> Result<Self, Self::Error> {
        Self::try_from(String::from_utf8_lossy(line).as_ref())
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb.as_str())?;

        // Credentials never reach the logs
        if self.verb == Verb::Pass && !self.args.is_empty() {
            return f.write_str(" ****");
        }

        for arg in &self.args {
            write!(f, " {arg}")?;
        }

        Ok(())
    }
}
