use core::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufRead;

/// Opaque identifier of a message within one user's maildrop.
///
/// For the file store this is the file name, for the memory store a ULID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message as enumerated from the store when a maildrop is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub id: MessageId,
    /// Size in octets
    pub size: usize,
}

impl MessageEntry {
    #[must_use]
    pub const fn new(id: MessageId, size: usize) -> Self {
        Self { id, size }
    }
}

/// Line-readable stream over the raw contents of one message
pub type MessageReader = Box<dyn AsyncBufRead + Send + Unpin>;
