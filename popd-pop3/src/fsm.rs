//! POP3 finite state machine.
//!
//! Handlers do the credential lookups and feed only the outcome into
//! [`State::transition`], so every phase change happens here and nowhere
//! else.

use popd_common::traits::FiniteStateMachine;

use crate::{session_state::SessionState, state::State};

/// Outcome of a command that can change the session phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// USER named a known user
    UserAccepted(String),
    /// USER named nobody we know
    UserRejected,
    /// PASS matched the pending user
    PassAccepted,
    /// PASS did not match, or the maildrop could not be loaded
    PassRejected,
    Quit,
}

impl FiniteStateMachine for State {
    type Input = Transition;
    type Context = SessionState;

    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self {
        match (self, input) {
            (Self::Update, _) => Self::Update,
            (_, Transition::Quit) => {
                context.clear_pending_user();
                Self::Update
            }
            (Self::Authorization, Transition::UserAccepted(name)) => {
                context.set_pending_user(name);
                Self::AuthorizationPass
            }
            (Self::Authorization, Transition::UserRejected) => Self::Authorization,
            (Self::AuthorizationPass, Transition::PassAccepted) => {
                context.authenticate();
                Self::Transaction
            }
            (Self::AuthorizationPass, Transition::PassRejected) => {
                context.clear_pending_user();
                Self::Authorization
            }
            // Anything else was refused by `State::admits` before reaching us
            (state, _) => state,
        }
    }
}
