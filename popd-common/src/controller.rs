use futures_util::future::join_all;
use serde::Deserialize;
use tokio::sync::broadcast::Receiver;

use crate::{Signal, error::ControllerError, internal, listener::Listener, traits::Protocol};

#[derive(Deserialize)]
pub struct Controller<Proto: Protocol> {
    #[serde(alias = "listener")]
    listeners: Vec<Listener<Proto>>,
}

impl<Proto: Protocol> Default for Controller<Proto> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<Proto: Protocol> Controller<Proto> {
    #[must_use]
    pub const fn new(listeners: Vec<Listener<Proto>>) -> Self {
        Self { listeners }
    }

    #[must_use]
    pub fn listeners(&self) -> &[Listener<Proto>] {
        &self.listeners
    }

    /// Map over the args of all listeners, allowing modification before initialization
    ///
    /// This is useful for injecting dependencies that cannot be deserialized from RON,
    /// such as the shared mail store.
    pub fn map_args<F>(&mut self, f: F)
    where
        F: Fn(Proto::Args) -> Proto::Args,
    {
        for listener in &mut self.listeners {
            listener.map_args(&f);
        }
    }

    /// Override the port of every listener
    pub fn set_port(&mut self, port: u16) {
        for listener in &mut self.listeners {
            listener.set_port(port);
        }
    }

    ///
    /// Initialise this controller
    ///
    /// # Errors
    /// If there are no listeners, or any listener's arguments are invalid
    ///
    pub fn init(&mut self) -> Result<(), ControllerError> {
        internal!("Initialising Controller for {}", Proto::ty());

        if self.listeners.is_empty() {
            return Err(ControllerError::NoListeners(Proto::ty()));
        }

        self.listeners
            .iter_mut()
            .try_for_each(Listener::init)
            .map_err(ControllerError::from)
    }

    ///
    /// # Errors
    /// If any of the listeners have a failure
    ///
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn control(self, signal: Receiver<Signal>) -> Result<(), ControllerError> {
        join_all(self.listeners.iter().map(|l| l.serve(signal.resubscribe())))
            .await
            .into_iter()
            .try_for_each(|result| result.map_err(ControllerError::from))
    }
}
