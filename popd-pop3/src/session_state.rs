//! Identity carried by the POP3 state machine.
//!
//! Kept apart from the connection and the maildrop so that transitions stay
//! pure and can be tested without any I/O.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Name given by USER, only meaningful while waiting for PASS
    pending_user: Option<String>,

    /// Name of the authenticated user, set on entering the transaction phase
    user: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pending_user(&self) -> Option<&str> {
        self.pending_user.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub(crate) fn set_pending_user(&mut self, name: String) {
        self.pending_user = Some(name);
    }

    pub(crate) fn clear_pending_user(&mut self) {
        self.pending_user = None;
    }

    /// Promote the pending user to the authenticated user
    pub(crate) fn authenticate(&mut self) {
        self.user = self.pending_user.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_promotes_pending_user() {
        let mut state = SessionState::new();
        state.set_pending_user("alice".to_string());
        assert_eq!(state.pending_user(), Some("alice"));
        assert_eq!(state.user(), None);

        state.authenticate();
        assert_eq!(state.pending_user(), None);
        assert_eq!(state.user(), Some("alice"));
    }

    #[test]
    fn test_clear_pending_user() {
        let mut state = SessionState::new();
        state.set_pending_user("alice".to_string());
        state.clear_pending_user();

        assert_eq!(state, SessionState::default());
    }
}
