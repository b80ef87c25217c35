use std::{net::SocketAddr, sync::Arc};

use popd_common::{Signal, config::ServerTimeouts, error::SessionError};
use popd_pop3::session::{Session, SessionConfig};
use popd_store::{MemoryMailStore, Store};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf},
    sync::broadcast,
    task::JoinHandle,
};

pub const BANNER: &str = "test.example.com";

/// Builder for a [`TestClient`] connected to a fresh session
pub struct TestClientBuilder {
    store: Arc<dyn Store>,
    timeouts: ServerTimeouts,
}

impl TestClientBuilder {
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Start the session and consume its greeting
    pub async fn connect(self) -> TestClient {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let peer: SocketAddr = "192.0.2.1:40110".parse().unwrap();

        let session = Session::create(
            server,
            peer,
            SessionConfig::builder()
                .with_store(Some(self.store))
                .with_banner(BANNER.to_string())
                .with_timeouts(self.timeouts)
                .build(),
        );

        let (shutdown, signal) = broadcast::channel(1);
        let task = tokio::spawn(session.run(signal));

        let (reader, writer) = tokio::io::split(client);
        let mut client = TestClient {
            reader: BufReader::new(reader),
            writer,
            task,
            shutdown,
        };

        let greeting = client.line().await;
        assert_eq!(greeting, format!("+OK POP3 Server on {BANNER} ready"));

        client
    }
}

/// The client side of one session
pub struct TestClient {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    task: JoinHandle<Result<(), SessionError>>,
    shutdown: broadcast::Sender<Signal>,
}

impl TestClient {
    #[must_use]
    pub fn builder() -> TestClientBuilder {
        TestClientBuilder {
            store: Arc::new(MemoryMailStore::new()),
            timeouts: ServerTimeouts::default(),
        }
    }

    /// Connect to a session serving `store`
    pub async fn connect(store: &MemoryMailStore) -> Self {
        Self::builder()
            .with_store(Arc::new(store.clone()))
            .connect()
            .await
    }

    /// Write raw octets to the session
    pub async fn send_raw(&mut self, data: &[u8]) {
        self.writer.write_all(data).await.unwrap();
    }

    /// Write one command line
    pub async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\r\n").as_bytes()).await;
    }

    /// Read one response line, without its CRLF
    pub async fn line(&mut self) -> String {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await.unwrap();
        assert!(read > 0, "Session closed the connection");
        assert!(line.ends_with("\r\n"), "Line not CRLF terminated: {line:?}");

        line.truncate(line.len() - 2);
        line
    }

    /// Send a command and read its single line response
    pub async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.line().await
    }

    /// Read lines up to and including the terminating `.`
    pub async fn multiline(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.line().await;
            let done = line == ".";
            lines.push(line);
            if done {
                return lines;
            }
        }
    }

    /// Send a command and read its multi-line response
    pub async fn multiline_command(&mut self, line: &str) -> Vec<String> {
        self.send(line).await;
        self.multiline().await
    }

    /// USER then PASS, asserting both succeed
    pub async fn login(&mut self, user: &str, secret: &str) {
        assert_eq!(
            self.command(&format!("USER {user}")).await,
            "+OK User is valid, proceed with password"
        );
        assert_eq!(
            self.command(&format!("PASS {secret}")).await,
            "+OK Password is valid, mail loaded"
        );
    }

    /// Broadcast a shutdown to the session
    pub fn signal_shutdown(&self) {
        self.shutdown.send(Signal::Shutdown).unwrap();
    }

    /// Close the client's write half, as a client hanging up would
    pub async fn hang_up(&mut self) {
        self.writer.shutdown().await.unwrap();
    }

    /// Whether the session has closed its side of the connection
    pub async fn is_closed(&mut self) -> bool {
        let mut rest = String::new();
        matches!(self.reader.read_line(&mut rest).await, Ok(0))
    }

    /// Wait for the session task and return how it ended
    pub async fn finish(self) -> Result<(), SessionError> {
        let Self {
            reader,
            writer,
            task,
            shutdown,
        } = self;

        // Keep the signal alive until the session has finished
        let result = task.await.unwrap();
        drop((reader, writer, shutdown));
        result
    }
}
