use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::{Arc, LazyLock},
};

use popd_common::{
    Signal, controller::Controller, internal, listener::Listener, logging, tracing,
};
use popd_pop3::{Pop3, Pop3Args};
use popd_store::StoreConfig;
use serde::Deserialize;
use tokio::sync::broadcast;

#[derive(Default, Deserialize)]
pub struct Popd {
    #[serde(alias = "pop3")]
    pop3_controller: Controller<Pop3>,
    #[serde(default)]
    store: StoreConfig,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

#[tracing::instrument(level = "trace")]
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!("CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!("Terminate Signal received, shutting down");
        }
    };

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("Received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("Received: {e:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

impl Popd {
    /// A single listener on every interface at `port`, serving the default
    /// file store
    #[must_use]
    pub fn with_port(port: u16) -> Self {
        Self {
            pop3_controller: Controller::new(vec![Listener::new(
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
                Pop3Args::default(),
            )]),
            store: StoreConfig::default(),
        }
    }

    #[must_use]
    pub fn listeners(&self) -> &[Listener<Pop3>] {
        self.pop3_controller.listeners()
    }

    #[must_use]
    pub const fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Override the port of every configured listener
    pub fn set_port(&mut self, port: u16) {
        self.pop3_controller.set_port(port);
    }

    ///
    /// Open the store, hand it to every listener and serve until `signal`
    /// reports a shutdown
    ///
    /// # Errors
    /// If the store cannot be opened, a listener is misconfigured, or a
    /// socket cannot be bound
    ///
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn serve(mut self, signal: broadcast::Receiver<Signal>) -> anyhow::Result<()> {
        let store = self.store.into_store()?;

        self.pop3_controller
            .map_args(|args| args.with_store(Arc::clone(&store)));
        self.pop3_controller.init()?;

        self.pop3_controller.control(signal).await?;

        Ok(())
    }

    /// Run this controller, and everything it controls
    ///
    /// # Errors
    ///
    /// This function will return an error if the store or any listener fails
    /// to initialise.
    #[tracing::instrument(level = "trace", skip_all, err)]
    pub async fn run(self) -> anyhow::Result<()> {
        logging::init();

        internal!("Controller running");

        let ret = tokio::select! {
            r = self.serve(SHUTDOWN_BROADCAST.subscribe()) => {
                r
            }
            r = shutdown() => {
                r
            }
        };

        internal!("Shutting down...");

        ret
    }
}
