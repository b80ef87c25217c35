use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::BufReader;

use crate::{
    StoreError,
    r#trait::{MailStore, UserStore},
    types::{MessageEntry, MessageId, MessageReader},
};

const USERS_FILE: &str = "users.txt";

/// Directory-backed credential and mail store
///
/// Layout under `path`:
/// - `users.txt`: one `name secret` pair per line, blank lines and lines
///   starting with `#` are ignored
/// - `<name>/`: the user's maildrop, every regular file is one message,
///   ordered by file name
///
/// A user listed in `users.txt` without a directory has an empty maildrop.
/// The users file is re-read on every lookup, so accounts can be edited
/// while the server runs.
#[derive(Debug, Clone)]
pub struct FileMailStore {
    path: PathBuf,
}

impl Default for FileMailStore {
    fn default() -> Self {
        Self::new("./mail.store")
    }
}

/// A name is only usable as a single path component below the store root
fn checked_component(name: &str) -> crate::Result<&str> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        Err(StoreError::InvalidName(name.to_string()))
    } else {
        Ok(name)
    }
}

impl FileMailStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    ///
    /// Check that the store root exists and is a directory
    ///
    /// # Errors
    /// If the root is missing or is not a directory
    ///
    pub fn init(&self) -> crate::Result<()> {
        if !self.path.try_exists()? {
            return Err(StoreError::Validation(format!(
                "Store path does not exist: {}",
                self.path.display()
            )));
        }

        if !self.path.is_dir() {
            return Err(StoreError::Validation(format!(
                "Store path is not a directory: {}",
                self.path.display()
            )));
        }

        tracing::debug!("Using file mail store at {}", self.path.display());

        Ok(())
    }

    fn maildrop(&self, user: &str) -> crate::Result<PathBuf> {
        Ok(self.path.join(checked_component(user)?))
    }

    /// Look up the secret stored for `name`
    async fn secret_of(&self, name: &str) -> crate::Result<Option<String>> {
        let users = match tokio::fs::read_to_string(self.path.join(USERS_FILE)).await {
            Ok(users) => users,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(users
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(char::is_whitespace))
            .find(|(user, _)| *user == name)
            .map(|(_, secret)| secret.trim().to_string()))
    }
}

#[async_trait]
impl UserStore for FileMailStore {
    async fn user_exists(&self, name: &str) -> crate::Result<bool> {
        if checked_component(name).is_err() {
            return Ok(false);
        }

        Ok(self.secret_of(name).await?.is_some())
    }

    async fn verify(&self, name: &str, secret: &str) -> crate::Result<bool> {
        if checked_component(name).is_err() {
            return Ok(false);
        }

        Ok(self
            .secret_of(name)
            .await?
            .is_some_and(|stored| stored == secret))
    }
}

#[async_trait]
impl MailStore for FileMailStore {
    async fn load(&self, user: &str) -> crate::Result<Vec<MessageEntry>> {
        let dir = self.maildrop(user)?;

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!("Skipping non UTF-8 file name in {}", dir.display());
                continue;
            };

            if name.starts_with('.') {
                continue;
            }

            let size = usize::try_from(metadata.len())
                .map_err(|_| StoreError::Internal(format!("{name} is too large")))?;
            entries.push(MessageEntry::new(MessageId::new(name), size));
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(entries)
    }

    async fn open(&self, user: &str, id: &MessageId) -> crate::Result<MessageReader> {
        let path = self.maildrop(user)?.join(checked_component(id.as_str())?);

        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn expunge(&self, user: &str, ids: &[MessageId]) -> crate::Result<usize> {
        let dir = self.maildrop(user)?;
        let mut removed = 0;

        for id in ids {
            match tokio::fs::remove_file(dir.join(checked_component(id.as_str())?)).await {
                Ok(()) => removed += 1,
                // Another session may have expunged it first
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("{id} already removed from {}", dir.display());
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(removed)
    }
}
