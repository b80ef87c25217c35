use std::{
    collections::HashMap,
    io::Cursor,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{
    StoreError,
    r#trait::{MailStore, UserStore},
    types::{MessageEntry, MessageId, MessageReader},
};

#[derive(Debug, Default)]
struct Account {
    secret: String,
    messages: Vec<(MessageId, Arc<[u8]>)>,
}

/// In-memory credential and mail store
///
/// Accounts and their messages live in a `HashMap` behind an `RwLock`.
/// It's primarily intended for testing, but is also handy for running a
/// throwaway server. Cloning shares the underlying accounts.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl MemoryMailStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`Self::add_user`]
    #[must_use]
    pub fn with_user(self, name: impl Into<String>, secret: impl Into<String>) -> Self {
        self.add_user(name, secret);
        self
    }

    /// Create an account, or replace the password of an existing one
    pub fn add_user(&self, name: impl Into<String>, secret: impl Into<String>) {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        accounts.entry(name.into()).or_default().secret = secret.into();
    }

    /// Append a message to the end of a user's maildrop
    ///
    /// # Errors
    /// If the user does not exist
    pub fn deliver(&self, user: &str, data: impl Into<Vec<u8>>) -> crate::Result<MessageId> {
        let mut accounts = self.accounts.write()?;
        let account = accounts
            .get_mut(user)
            .ok_or_else(|| StoreError::UnknownUser(user.to_string()))?;

        let id = MessageId::generate();
        account
            .messages
            .push((id.clone(), Arc::from(data.into().into_boxed_slice())));

        Ok(id)
    }

    /// Number of messages currently held for `user`
    ///
    /// Recovers gracefully if the lock is poisoned by accessing the underlying data.
    #[must_use]
    pub fn message_count(&self, user: &str) -> usize {
        self.accounts
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user)
            .map_or(0, |account| account.messages.len())
    }
}

#[async_trait]
impl UserStore for MemoryMailStore {
    async fn user_exists(&self, name: &str) -> crate::Result<bool> {
        Ok(self.accounts.read()?.contains_key(name))
    }

    async fn verify(&self, name: &str, secret: &str) -> crate::Result<bool> {
        Ok(self
            .accounts
            .read()?
            .get(name)
            .is_some_and(|account| account.secret == secret))
    }
}

#[async_trait]
impl MailStore for MemoryMailStore {
    async fn load(&self, user: &str) -> crate::Result<Vec<MessageEntry>> {
        let accounts = self.accounts.read()?;
        let account = accounts
            .get(user)
            .ok_or_else(|| StoreError::UnknownUser(user.to_string()))?;

        Ok(account
            .messages
            .iter()
            .map(|(id, data)| MessageEntry::new(id.clone(), data.len()))
            .collect())
    }

    async fn open(&self, user: &str, id: &MessageId) -> crate::Result<MessageReader> {
        let accounts = self.accounts.read()?;
        let data = accounts
            .get(user)
            .ok_or_else(|| StoreError::UnknownUser(user.to_string()))?
            .messages
            .iter()
            .find_map(|(candidate, data)| (candidate == id).then(|| Arc::clone(data)))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        Ok(Box::new(Cursor::new(data)))
    }

    async fn expunge(&self, user: &str, ids: &[MessageId]) -> crate::Result<usize> {
        let mut accounts = self.accounts.write()?;
        let account = accounts
            .get_mut(user)
            .ok_or_else(|| StoreError::UnknownUser(user.to_string()))?;

        let before = account.messages.len();
        account.messages.retain(|(id, _)| !ids.contains(id));

        Ok(before - account.messages.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    fn store() -> MemoryMailStore {
        MemoryMailStore::new()
            .with_user("alice", "wonderland")
            .with_user("bob", "builder")
    }

    #[tokio::test]
    async fn test_credentials() {
        let store = store();

        assert!(store.user_exists("alice").await.unwrap());
        assert!(!store.user_exists("Alice").await.unwrap());
        assert!(!store.user_exists("mallory").await.unwrap());

        assert!(store.verify("alice", "wonderland").await.unwrap());
        assert!(!store.verify("alice", "builder").await.unwrap());
        assert!(!store.verify("mallory", "wonderland").await.unwrap());
    }

    #[tokio::test]
    async fn test_load_keeps_delivery_order() {
        let store = store();
        let first = store.deliver("bob", vec![b'a'; 120]).unwrap();
        let second = store.deliver("bob", vec![b'b'; 80]).unwrap();

        let entries = store.load("bob").await.unwrap();
        assert_eq!(
            entries,
            vec![MessageEntry::new(first, 120), MessageEntry::new(second, 80)]
        );

        assert!(store.load("alice").await.unwrap().is_empty());
        assert!(matches!(
            store.load("mallory").await,
            Err(StoreError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn test_open() {
        let store = store();
        let id = store.deliver("alice", "Subject: hi\r\n\r\nbody\r\n").unwrap();

        let mut contents = String::new();
        store
            .open("alice", &id)
            .await
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "Subject: hi\r\n\r\nbody\r\n");

        assert!(matches!(
            store.open("alice", &MessageId::new("missing")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_expunge() {
        let store = store();
        let first = store.deliver("alice", "one").unwrap();
        let second = store.deliver("alice", "two").unwrap();
        let third = store.deliver("alice", "three").unwrap();

        let removed = store
            .expunge("alice", &[first, third, MessageId::new("missing")])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let remaining = store.load("alice").await.unwrap();
        assert_eq!(remaining, vec![MessageEntry::new(second, 3)]);
        assert_eq!(store.message_count("alice"), 1);
    }

    #[test]
    fn test_deliver_unknown_user() {
        assert!(matches!(
            store().deliver("mallory", "spam"),
            Err(StoreError::UnknownUser(_))
        ));
    }
}
