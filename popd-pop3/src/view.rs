//! Per-session snapshot of a maildrop.
//!
//! The view is built once, when PASS succeeds, and numbers the messages
//! present at that moment 1..=N. Positions never shift: a deleted message
//! keeps its slot and is only hidden. Deletions reach the store through
//! [`MailboxView::commit`] and nowhere else.

use std::sync::Arc;

use popd_store::{MessageEntry, MessageId, MessageReader, Store, StoreError};

use crate::error::ViewError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSlot {
    position: usize,
    size: usize,
    id: MessageId,
    deleted: bool,
}

impl MessageSlot {
    /// 1-based position in the maildrop
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Size in octets
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}

pub struct MailboxView {
    user: String,
    store: Arc<dyn Store>,
    slots: Vec<MessageSlot>,
}

impl std::fmt::Debug for MailboxView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxView")
            .field("user", &self.user)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl MailboxView {
    ///
    /// Snapshot `user`'s maildrop
    ///
    /// # Errors
    /// If the store cannot enumerate the maildrop
    ///
    #[tracing::instrument(level = "debug", skip(store))]
    pub async fn load(user: &str, store: Arc<dyn Store>) -> Result<Self, StoreError> {
        let entries = store.load(user).await?;
        Ok(Self::from_entries(user, store, entries))
    }

    fn from_entries(user: &str, store: Arc<dyn Store>, entries: Vec<MessageEntry>) -> Self {
        let slots = entries
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| MessageSlot {
                position: idx + 1,
                size: entry.size,
                id: entry.id,
                deleted: false,
            })
            .collect();

        Self {
            user: user.to_string(),
            store,
            slots,
        }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Number of messages, optionally counting those marked deleted
    #[must_use]
    pub fn length(&self, include_deleted: bool) -> usize {
        if include_deleted {
            self.slots.len()
        } else {
            self.slots().count()
        }
    }

    /// Combined size of the messages not marked deleted
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.slots().map(MessageSlot::size).sum()
    }

    /// Messages not marked deleted, in position order
    pub fn slots(&self) -> impl Iterator<Item = &MessageSlot> {
        self.slots.iter().filter(|slot| !slot.deleted)
    }

    /// The message at `position`, unless it is out of range or deleted
    #[must_use]
    pub fn retrieve(&self, position: usize) -> Option<&MessageSlot> {
        position
            .checked_sub(1)
            .and_then(|idx| self.slots.get(idx))
            .filter(|slot| !slot.deleted)
    }

    ///
    /// Mark the message at `position` for deletion at commit
    ///
    /// # Errors
    /// If [`Self::retrieve`] would not find the message
    ///
    pub fn mark_deleted(&mut self, position: usize) -> Result<(), ViewError> {
        let slot = position
            .checked_sub(1)
            .and_then(|idx| self.slots.get_mut(idx))
            .filter(|slot| !slot.deleted)
            .ok_or(ViewError::NoSuchMessage(position))?;

        slot.deleted = true;
        Ok(())
    }

    /// Clear every deletion mark, returning how many were set
    pub fn undelete_all(&mut self) -> usize {
        let mut restored = 0;
        for slot in self.slots.iter_mut().filter(|slot| slot.deleted) {
            slot.deleted = false;
            restored += 1;
        }

        restored
    }

    ///
    /// Open the contents of a visible message
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the message is out of range or deleted,
    /// otherwise whatever the store reports
    ///
    pub async fn open(&self, position: usize) -> Result<MessageReader, StoreError> {
        let slot = self.retrieve(position).ok_or_else(|| {
            StoreError::NotFound(MessageId::new(format!("#{position}")))
        })?;

        self.store.open(&self.user, &slot.id).await
    }

    ///
    /// Apply the deletion marks to the store and give up the view
    ///
    /// # Errors
    /// If the store fails to remove the marked messages
    ///
    #[tracing::instrument(level = "debug", skip(self), fields(user = %self.user))]
    pub async fn commit(self) -> Result<usize, StoreError> {
        let marked: Vec<MessageId> = self
            .slots
            .into_iter()
            .filter(|slot| slot.deleted)
            .map(|slot| slot.id)
            .collect();

        if marked.is_empty() {
            return Ok(0);
        }

        self.store.expunge(&self.user, &marked).await
    }

    /// Give up the view, forgetting every deletion mark
    pub fn discard(self) {
        tracing::debug!(
            user = %self.user,
            marked = self.length(true) - self.length(false),
            "Discarding mailbox view"
        );
    }
}
