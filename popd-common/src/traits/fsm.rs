/// A pure state machine: the next state depends only on the current state,
/// the input, and the protocol context it is allowed to update.
pub trait FiniteStateMachine {
    type Input;
    type Context;

    #[must_use]
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self;
}
