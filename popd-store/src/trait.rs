use std::fmt::Debug;

use async_trait::async_trait;

use crate::types::{MessageEntry, MessageId, MessageReader};

/// Credential lookups used during the authorization phase.
#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    /// Whether `name` identifies a known user
    async fn user_exists(&self, name: &str) -> crate::Result<bool>;

    /// Whether `secret` is the password of `name`
    async fn verify(&self, name: &str, secret: &str) -> crate::Result<bool>;
}

/// Access to the messages held for each user.
///
/// Deletion state is never kept here: sessions track their own marks and
/// only call [`MailStore::expunge`] when those marks become permanent.
#[async_trait]
pub trait MailStore: Send + Sync + Debug {
    /// Enumerate the user's maildrop in store order
    async fn load(&self, user: &str) -> crate::Result<Vec<MessageEntry>>;

    /// Open the contents of one message for streaming
    async fn open(&self, user: &str, id: &MessageId) -> crate::Result<MessageReader>;

    /// Permanently remove the given messages, returning how many were removed
    async fn expunge(&self, user: &str, ids: &[MessageId]) -> crate::Result<usize>;
}

/// A store that can both authenticate users and serve their maildrops
pub trait Store: UserStore + MailStore {}

impl<T: UserStore + MailStore> Store for T {}
