use std::net::SocketAddr;

use futures_util::future::join_all;
use serde::Deserialize;
use tokio::{
    net::TcpListener,
    sync::broadcast::{Receiver, error::RecvError},
    task::JoinHandle,
};

use crate::{
    Signal,
    error::{ListenerError, ProtocolError},
    internal,
    traits::protocol::{Protocol, SessionHandler},
};

#[derive(Deserialize)]
pub struct Listener<Proto: Protocol> {
    #[serde(skip)]
    handler: Proto,
    socket: SocketAddr,
    #[serde(default)]
    args: Proto::Args,
}

impl<Proto: Protocol> Listener<Proto> {
    #[must_use]
    pub fn new(socket: SocketAddr, args: Proto::Args) -> Self {
        Self {
            handler: Proto::default(),
            socket,
            args,
        }
    }

    #[must_use]
    pub const fn socket(&self) -> SocketAddr {
        self.socket
    }

    #[must_use]
    pub const fn args(&self) -> &Proto::Args {
        &self.args
    }

    /// Replace the port this listener binds to, keeping its address
    pub fn set_port(&mut self, port: u16) {
        self.socket.set_port(port);
    }

    /// Rebuild the protocol arguments, e.g. to inject runtime resources
    /// that cannot come from the configuration file
    pub fn map_args<F>(&mut self, f: &F)
    where
        F: Fn(Proto::Args) -> Proto::Args,
    {
        self.args = f(std::mem::take(&mut self.args));
    }

    ///
    /// Validate this listener's protocol arguments
    ///
    /// # Errors
    /// Whatever the protocol rejects about its arguments
    ///
    #[tracing::instrument(level = "trace", skip(self), fields(socket = %self.socket))]
    pub fn init(&mut self) -> Result<(), ProtocolError> {
        self.handler.validate(&mut self.args)
    }

    ///
    /// Bind the configured socket and serve sessions until shutdown
    ///
    /// # Errors
    /// If the socket cannot be bound
    ///
    pub async fn serve(&self, shutdown: Receiver<Signal>) -> Result<(), ListenerError> {
        let listener =
            TcpListener::bind(self.socket)
                .await
                .map_err(|source| ListenerError::BindFailed {
                    address: self.socket.to_string(),
                    source,
                })?;

        self.serve_on(listener, shutdown).await
    }

    ///
    /// Serve sessions accepted from an already bound listener until a
    /// shutdown signal arrives, then wait for the live sessions to finish
    ///
    /// # Errors
    /// Currently never fails; accept errors are logged and the loop continues
    ///
    #[tracing::instrument(level = "trace", skip_all, fields(socket = %self.socket))]
    pub async fn serve_on(
        &self,
        listener: TcpListener,
        mut shutdown: Receiver<Signal>,
    ) -> Result<(), ListenerError> {
        let local = listener.local_addr()?;
        internal!(level = INFO, "{} listening on {local}", Proto::ty());

        let mut sessions: Vec<JoinHandle<()>> = Vec::default();

        loop {
            tokio::select! {
                sig = shutdown.recv() => {
                    if matches!(sig, Ok(Signal::Shutdown) | Err(RecvError::Closed)) {
                        internal!(
                            level = INFO,
                            "{} Listener {local} received shutdown, finishing {} sessions ...",
                            Proto::ty(),
                            sessions.len()
                        );
                        join_all(sessions).await;
                        return Ok(());
                    }
                }

                connection = listener.accept() => {
                    match connection {
                        Ok((stream, peer)) => {
                            tracing::debug!("Connection received on {local} from {peer}");

                            let session = self.handler.handle(stream, peer, self.args.clone());
                            let signal = shutdown.resubscribe();

                            sessions.retain(|handle| !handle.is_finished());
                            sessions.push(tokio::spawn(async move {
                                if let Err(err) = session.run(signal).await {
                                    internal!(level = ERROR, "Session with {peer} ended: {err}");
                                }
                            }));
                        }
                        Err(err) => {
                            internal!(level = ERROR, "{}", ListenerError::AcceptFailed(err));
                        }
                    }
                }
            }
        }
    }
}
