pub mod command;
pub mod connection;
pub mod error;
pub mod fsm;
pub mod session;
pub mod session_state;
pub mod state;
pub mod view;

use std::{net::SocketAddr, sync::Arc};

use popd_common::{
    Signal,
    config::ServerTimeouts,
    error::{ProtocolError, SessionError},
    traits::{Protocol, SessionHandler},
};
use popd_store::Store;
use serde::Deserialize;
use tokio::net::TcpStream;

use crate::session::{Session, SessionConfig};

#[derive(Default, Deserialize)]
pub struct Pop3;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Pop3Args {
    /// Host name announced in the greeting, `$HOSTNAME` when empty
    #[serde(default)]
    banner: String,
    #[serde(default)]
    timeouts: ServerTimeouts,
    #[serde(skip)]
    store: Option<Arc<dyn Store>>,
}

impl Pop3Args {
    /// Create a new `Pop3Args` builder
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Set the host name announced in the greeting
    #[must_use]
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    /// Set the session timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the store sessions authenticate against and serve mail from
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn banner(&self) -> &str {
        &self.banner
    }

    #[must_use]
    pub const fn timeouts(&self) -> &ServerTimeouts {
        &self.timeouts
    }
}

impl Protocol for Pop3 {
    type Session = Session<TcpStream>;
    type Args = Pop3Args;

    fn ty() -> &'static str {
        "POP3"
    }

    #[tracing::instrument(level = "trace", skip(self, stream, args))]
    fn handle(&self, stream: TcpStream, peer: SocketAddr, args: Self::Args) -> Self::Session {
        Session::create(
            stream,
            peer,
            SessionConfig::builder()
                .with_store(args.store)
                .with_banner(args.banner)
                .with_timeouts(args.timeouts)
                .build(),
        )
    }

    #[tracing::instrument(level = "trace", skip(self, args))]
    fn validate(&mut self, args: &mut Self::Args) -> Result<(), ProtocolError> {
        if args.store.is_none() {
            return Err(ProtocolError::MissingField("store"));
        }

        if args.banner.contains(['\r', '\n']) {
            return Err(ProtocolError::InvalidConfiguration {
                field: "banner".to_string(),
                reason: "must not contain CR or LF".to_string(),
            });
        }

        if args.timeouts.command_secs == 0 || args.timeouts.connection_secs == 0 {
            return Err(ProtocolError::InvalidConfiguration {
                field: "timeouts".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(())
    }
}

impl SessionHandler for Session<TcpStream> {
    async fn run(self, signal: tokio::sync::broadcast::Receiver<Signal>) -> Result<(), SessionError> {
        Self::run(self, signal).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use popd_store::MemoryMailStore;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_validate_requires_store() {
        let mut args = Pop3Args::builder();
        assert!(matches!(
            Pop3.validate(&mut args),
            Err(ProtocolError::MissingField("store"))
        ));

        let mut args = args.with_store(Arc::new(MemoryMailStore::new()));
        assert!(Pop3.validate(&mut args).is_ok());
    }

    #[test]
    fn test_validate_banner() {
        let mut args = Pop3Args::builder()
            .with_store(Arc::new(MemoryMailStore::new()))
            .with_banner("mail.example.com\r\n+OK forged");

        assert!(matches!(
            Pop3.validate(&mut args),
            Err(ProtocolError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_timeouts() {
        let mut args = Pop3Args::builder()
            .with_store(Arc::new(MemoryMailStore::new()))
            .with_timeouts(ServerTimeouts {
                command_secs: 0,
                connection_secs: 60,
            });

        assert!(Pop3.validate(&mut args).is_err());
    }

    #[test]
    fn test_deserialize_args() {
        let args: Pop3Args =
            ron::from_str(r#"(banner: "mail.example.com", timeouts: (command_secs: 30))"#)
                .unwrap();

        assert_eq!(args.banner(), "mail.example.com");
        assert_eq!(args.timeouts().command_secs, 30);
        assert_eq!(args.timeouts().connection_secs, 3600);
        assert!(args.store.is_none());

        let args: Pop3Args = ron::from_str("()").unwrap();
        assert_eq!(args.banner(), "");
    }
}
