use std::{net::SocketAddr, sync::Arc, time::Instant};

use popd_common::{
    Signal, config::ServerTimeouts, error::SessionError, internal, outgoing, tracing,
};
use popd_store::{MemoryMailStore, Store};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::broadcast::Receiver,
};

use crate::{
    connection::{Connection, Line, MAX_LINE},
    session_state::SessionState,
    state::State,
    view::MailboxView,
};

mod handlers;
pub mod response;

pub use handlers::Outcome;
use response::{Reply, text};

#[derive(Debug)]
pub struct SessionConfig {
    pub store: Arc<dyn Store>,
    pub banner: String,
    pub timeouts: ServerTimeouts,
}

impl SessionConfig {
    /// Create a new `SessionConfig` builder
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for `SessionConfig`
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    store: Option<Arc<dyn Store>>,
    banner: String,
    timeouts: ServerTimeouts,
}

impl SessionConfigBuilder {
    /// Set the store used to authenticate users and serve their maildrops
    #[must_use]
    pub fn with_store(mut self, store: Option<Arc<dyn Store>>) -> Self {
        self.store = store;
        self
    }

    /// Set the host name announced in the greeting
    #[must_use]
    pub fn with_banner(mut self, banner: String) -> Self {
        self.banner = banner;
        self
    }

    /// Set the timeout configuration for this session
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Build the final `SessionConfig`
    ///
    /// Without a store every login fails, as nobody is known.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryMailStore::new())),
            banner: self.banner,
            timeouts: self.timeouts,
        }
    }
}

/// What ended the wait for the next command line
enum Received {
    Line(Line),
    Shutdown,
    TimedOut(u64),
}

pub struct Session<Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync> {
    peer: SocketAddr,
    connection: Connection<Stream>,
    state: State,
    session_state: SessionState,
    /// Present exactly while `state` is `Transaction`
    view: Option<MailboxView>,
    store: Arc<dyn Store>,
    banner: Arc<str>,
    timeouts: ServerTimeouts,
    start_time: Instant,
}

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync> Session<Stream> {
    #[tracing::instrument(level = "trace", skip_all, fields(%peer))]
    pub fn create(stream: Stream, peer: SocketAddr, config: SessionConfig) -> Self {
        tracing::debug!("Config: {:?}", config);

        Self {
            peer,
            connection: Connection::new(stream),
            state: State::default(),
            session_state: SessionState::new(),
            view: None,
            store: config.store,
            banner: if config.banner.is_empty() {
                std::env::var("HOSTNAME")
                    .unwrap_or_else(|_| "localhost".to_string())
                    .into()
            } else {
                config.banner.into()
            },
            timeouts: config.timeouts,
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    ///
    /// Drive the session until QUIT, end of stream, a fatal error or a
    /// shutdown signal. Deletion marks only survive a QUIT.
    ///
    /// # Errors
    /// On I/O failure, a timeout, or a line the session cannot recover from
    ///
    #[tracing::instrument(level = "trace", skip_all, fields(peer = %self.peer))]
    pub async fn run(mut self, mut signal: Receiver<Signal>) -> Result<(), SessionError> {
        internal!("Connected");

        let result = self.serve(&mut signal).await;

        if let Some(view) = self.view.take() {
            view.discard();
        }

        internal!("Connection closed");

        result
    }

    async fn serve(&mut self, signal: &mut Receiver<Signal>) -> Result<(), SessionError> {
        let greeting = Reply::ok(format!("POP3 Server on {} ready", self.banner));
        self.reply(&greeting).await?;
        self.connection.flush().await?;

        let mut buffer = Vec::with_capacity(MAX_LINE);

        loop {
            match self.receive(&mut buffer, signal).await? {
                Received::Line(Line::Complete) => {}
                Received::Line(Line::Eof) => {
                    internal!(level = DEBUG, "Peer closed the connection");
                    return Ok(());
                }
                Received::Line(Line::Truncated) => {
                    return self.abort("Command line too long").await;
                }
                Received::Shutdown => {
                    internal!(level = INFO, "Closing session for shutdown");
                    self.reply(&Reply::err(text::SHUTTING_DOWN)).await?;
                    self.connection.flush().await?;
                    return Ok(());
                }
                Received::TimedOut(secs) => {
                    tracing::warn!(
                        peer = %self.peer,
                        state = %self.state,
                        timeout_secs = secs,
                        "Client connection timed out"
                    );
                    return Err(SessionError::Timeout(secs));
                }
            }

            if buffer.contains(&0) {
                return self.abort("NUL octet in command line").await;
            }

            let outcome = self.dispatch(&buffer).await;
            self.connection.flush().await?;

            if outcome? == Outcome::Terminate {
                return Ok(());
            }
        }
    }

    /// Wait for the next command line, a shutdown signal, or a timeout
    async fn receive(
        &mut self,
        buffer: &mut Vec<u8>,
        signal: &mut Receiver<Signal>,
    ) -> Result<Received, SessionError> {
        let remaining = self
            .timeouts
            .connection_timeout()
            .saturating_sub(self.start_time.elapsed());
        let (wait, limit_secs) = if remaining < self.timeouts.command_timeout() {
            (remaining, self.timeouts.connection_secs)
        } else {
            (self.timeouts.command_timeout(), self.timeouts.command_secs)
        };

        tokio::select! {
            _ = signal.recv() => Ok(Received::Shutdown),
            result = tokio::time::timeout(wait, self.connection.read_line(buffer)) => {
                match result {
                    Ok(line) => Ok(Received::Line(line?)),
                    Err(_) => Ok(Received::TimedOut(limit_secs)),
                }
            }
        }
    }

    /// Answer a line the session cannot continue from, then give up
    async fn abort(&mut self, reason: &str) -> Result<(), SessionError> {
        internal!(level = WARN, "{reason}");

        // Best effort, the session is over either way
        if self.reply(&Reply::err(text::UNRECOGNIZED)).await.is_ok() {
            let _ = self.connection.flush().await;
        }

        Err(SessionError::Protocol(reason.to_string()))
    }

    /// Queue one response line
    async fn reply(&mut self, reply: &Reply) -> Result<(), SessionError> {
        outgoing!("{reply}");

        self.connection.send(reply).await.map_err(|err| {
            internal!(level = ERROR, "{err}");
            SessionError::from(err)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = SessionConfig::builder().build();

        assert!(config.banner.is_empty());
        assert_eq!(config.timeouts, ServerTimeouts::default());
    }

    #[test]
    fn test_configured_banner() {
        let (_client, server) = tokio::io::duplex(64);
        let session = Session::create(
            server,
            "127.0.0.1:110".parse().unwrap(),
            SessionConfig::builder()
                .with_banner("mail.example.com".to_string())
                .build(),
        );

        assert_eq!(&*session.banner, "mail.example.com");
        assert_eq!(session.state(), State::Authorization);
        assert!(session.view.is_none());
    }
}
