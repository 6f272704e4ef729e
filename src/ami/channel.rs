//! Line-oriented channel over a single duplex byte stream.
//!
//! [`LineChannel`] is the only component that touches the socket. It knows
//! nothing about actions or events: it writes CRLF-terminated lines and reads
//! them back one at a time, applying a per-line read timeout so a stalled
//! switch surfaces as [`AppError::Connection`] instead of blocking forever.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::debug;

use crate::ami::codec::AmiCodec;
use crate::{AppError, Result};

/// CRLF line reader/writer over one connection.
#[derive(Debug)]
pub struct LineChannel<S> {
    framed: Framed<S, AmiCodec>,
    read_timeout: Duration,
}

impl<S> LineChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap `stream`, reading with the given per-line timeout.
    #[must_use]
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            framed: Framed::new(stream, AmiCodec::new()),
            read_timeout,
        }
    }

    /// Write a sequence of lines with a single flush at the end.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connection` if any write fails.
    pub async fn write_block<I, T>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for line in lines {
            self.framed.feed(line.as_ref()).await?;
        }
        SinkExt::<&str>::flush(&mut self.framed).await
    }

    /// Read the next line with its terminator stripped.
    ///
    /// Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    ///
    /// - `AppError::Connection` on I/O failure or when no line arrives
    ///   within the read timeout.
    /// - `AppError::Protocol` when a line exceeds the codec's length limit.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        match tokio::time::timeout(self.read_timeout, self.framed.next()).await {
            Err(_) => Err(AppError::Connection(format!(
                "no data from switch within {:?}",
                self.read_timeout
            ))),
            Ok(None) => {
                debug!("ami channel: end of stream");
                Ok(None)
            }
            Ok(Some(line)) => line.map(Some),
        }
    }

    /// Flush pending writes and shut down the write half.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Connection` if the shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        SinkExt::<&str>::close(&mut self.framed).await
    }
}
