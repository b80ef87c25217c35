use std::{path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::{
    backends::{FileMailStore, MemoryMailStore},
    r#trait::Store,
};

/// An account seeded into a memory store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MemoryUser {
    pub name: String,
    pub secret: String,
}

/// Configuration for the credential and mail store
///
/// File-backed store in RON config:
/// ```ron
/// Popd (
///     store: File(
///         path: "/var/mail/popd",
///     ),
/// )
/// ```
///
/// Memory-backed store with seeded accounts (testing/development):
/// ```ron
/// Popd (
///     store: Memory(
///         users: [(name: "alice", secret: "wonderland")],
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum StoreConfig {
    /// Directory of maildrops plus a `users.txt` credential file
    File { path: PathBuf },
    /// Everything held in memory, lost on exit
    Memory {
        #[serde(default)]
        users: Vec<MemoryUser>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::File {
            path: PathBuf::from("./mail.store"),
        }
    }
}

impl StoreConfig {
    /// Filesystem root for file-backed stores
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::File { path } => Some(path),
            Self::Memory { .. } => None,
        }
    }

    /// Convert the configuration into a concrete store
    ///
    /// # Errors
    /// If a file store's root does not exist or is not a directory
    pub fn into_store(self) -> crate::Result<Arc<dyn Store>> {
        match self {
            Self::File { path } => {
                let store = FileMailStore::new(path);
                store.init()?;
                Ok(Arc::new(store))
            }
            Self::Memory { users } => {
                let store = MemoryMailStore::new();
                for user in users {
                    store.add_user(user.name, user.secret);
                }
                Ok(Arc::new(store))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{MailStore, StoreError, UserStore};

    #[test]
    fn test_parse_file() {
        let config: StoreConfig = ron::from_str(r#"File(path: "/var/mail/popd")"#).unwrap();

        assert_eq!(
            config,
            StoreConfig::File {
                path: PathBuf::from("/var/mail/popd")
            }
        );
        assert_eq!(config.path(), Some(std::path::Path::new("/var/mail/popd")));
    }

    #[test]
    fn test_parse_memory() {
        let config: StoreConfig = ron::from_str(
            r#"Memory(users: [(name: "alice", secret: "wonderland"), (name: "bob", secret: "builder")])"#,
        )
        .unwrap();

        let StoreConfig::Memory { users } = &config else {
            panic!("Expected memory store, got {config:?}");
        };
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "bob");
        assert!(config.path().is_none());

        let empty: StoreConfig = ron::from_str("Memory()").unwrap();
        assert_eq!(empty, StoreConfig::Memory { users: Vec::new() });
    }

    #[tokio::test]
    async fn test_into_store() {
        let store = StoreConfig::Memory {
            users: vec![MemoryUser {
                name: "alice".to_string(),
                secret: "wonderland".to_string(),
            }],
        }
        .into_store()
        .unwrap();

        assert!(store.verify("alice", "wonderland").await.unwrap());
        assert!(store.load("alice").await.unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let store = StoreConfig::File {
            path: dir.path().to_path_buf(),
        }
        .into_store();
        assert!(store.is_ok());

        let missing = StoreConfig::File {
            path: dir.path().join("missing"),
        }
        .into_store();
        assert!(matches!(missing, Err(StoreError::Validation(_))));
    }
}
