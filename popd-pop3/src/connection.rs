use core::fmt::Display;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream,
};

use crate::error::ConnectionResult;

/// Longest command line accepted, terminator included (RFC 2449 Section 4)
pub const MAX_LINE: usize = 1024;

/// Result of reading one command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// A full line, terminator included, is in the buffer
    Complete,
    /// [`MAX_LINE`] octets arrived without a line feed
    Truncated,
    /// The peer closed its side; anything after the last full line is dropped
    Eof,
}

/// Buffered, line oriented client connection
pub struct Connection<Stream: AsyncRead + AsyncWrite + Unpin + Send> {
    stream: BufStream<Stream>,
}

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send> Connection<Stream> {
    pub fn new(stream: Stream) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }

    ///
    /// Read the next line into `buffer`, never buffering more than
    /// [`MAX_LINE`] octets of it
    ///
    /// # Errors
    /// If reading from the peer fails
    ///
    pub async fn read_line(&mut self, buffer: &mut Vec<u8>) -> ConnectionResult<Line> {
        buffer.clear();

        let read = (&mut self.stream)
            .take(MAX_LINE as u64)
            .read_until(b'\n', buffer)
            .await?;

        Ok(if buffer.ends_with(b"\n") {
            Line::Complete
        } else if read == MAX_LINE {
            Line::Truncated
        } else {
            Line::Eof
        })
    }

    ///
    /// Queue a single response line, appending CRLF
    ///
    /// # Errors
    /// If writing to the peer fails
    ///
    pub async fn send<S: Display + Send + Sync>(&mut self, response: &S) -> ConnectionResult<()> {
        let line = format!("{response}\r\n");
        self.stream.write_all(line.as_bytes()).await?;
        Ok(())
    }

    ///
    /// Queue raw octets, which must already carry their line terminators
    ///
    /// # Errors
    /// If writing to the peer fails
    ///
    pub async fn send_raw(&mut self, data: &[u8]) -> ConnectionResult<()> {
        self.stream.write_all(data).await?;
        Ok(())
    }

    ///
    /// Push everything queued out to the peer
    ///
    /// # Errors
    /// If writing to the peer fails
    ///
    pub async fn flush(&mut self) -> ConnectionResult<()> {
        self.stream.flush().await?;
        Ok(())
    }
}
