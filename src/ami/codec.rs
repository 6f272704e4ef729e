//! CRLF line codec for manager interface streams.
//!
//! Splits inbound bytes on `\n` with [`tokio_util::codec::AnyDelimiterCodec`]
//! and a maximum line length, so a misbehaving switch cannot make the client
//! allocate without bound while it waits for a line terminator.
//!
//! Lines are decoded as UTF-8 lossily. Switches pass through whatever bytes
//! were configured for caller names and similar fields (often Latin-1), and a
//! stray byte in a field nobody reads must not end the session.
//!
//! # Usage
//!
//! Use [`AmiCodec`] as the codec parameter for [`tokio_util::codec::Framed`].
//! Inbound lines are split on `\n` with any trailing `\r` removed; outbound
//! lines are written with a `\r\n` terminator as the wire format requires.
//!
//! ```rust,ignore
//! use tokio_util::codec::Framed;
//! use ami_monitor::ami::codec::AmiCodec;
//!
//! let framed = Framed::new(tcp_stream, AmiCodec::new());
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};
use tracing::debug;

use crate::{AppError, Result};

/// Maximum line length accepted by the AMI codec: 64 KiB.
///
/// Lines exceeding this limit cause [`AmiCodec::decode`] to return
/// [`AppError::Protocol`] with `"line too long"`.
pub const MAX_LINE_BYTES: usize = 65_536;

/// Line terminator used on the wire in both directions.
pub const CRLF: &str = "\r\n";

/// CRLF line codec for the bidirectional manager interface stream.
///
/// # Decoder
///
/// Yields each line without its terminator. Invalid UTF-8 is replaced with
/// U+FFFD. Inbound lines longer than [`MAX_LINE_BYTES`] return
/// [`AppError::Protocol`]. I/O errors are mapped to [`AppError::Connection`].
///
/// # Encoder
///
/// Outbound strings are encoded as `item\r\n`. An empty string therefore
/// produces the bare `\r\n` that closes an action block.
#[derive(Debug)]
pub struct AmiCodec(AnyDelimiterCodec);

impl AmiCodec {
    /// Create a new `AmiCodec` with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            CRLF.as_bytes().to_vec(),
            MAX_LINE_BYTES,
        ))
    }
}

impl Default for AmiCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AmiCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next line from `src`.
    ///
    /// Returns `Ok(None)` when `src` contains no complete line yet.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let chunk = self.0.decode(src).map_err(map_codec_error)?;
        Ok(chunk.map(into_line))
    }

    /// Decode the final unterminated line when the stream reaches EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let chunk = self.0.decode_eof(src).map_err(map_codec_error)?;
        Ok(chunk.map(into_line))
    }
}

impl<T: AsRef<str>> Encoder<T> for AmiCodec {
    type Error = AppError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<()> {
        let line = item.as_ref();
        dst.reserve(line.len() + CRLF.len());
        dst.put(line.as_bytes());
        dst.put(CRLF.as_bytes());
        Ok(())
    }
}

/// Strip a trailing `\r` and decode the rest as UTF-8, lossily.
fn into_line(chunk: Bytes) -> String {
    let bytes = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
    match String::from_utf8_lossy(bytes) {
        std::borrow::Cow::Borrowed(line) => line.to_owned(),
        std::borrow::Cow::Owned(line) => {
            debug!(line = %line, "ami codec: replaced invalid UTF-8 in line");
            line
        }
    }
}

/// Map an [`AnyDelimiterCodecError`] to an [`AppError`].
fn map_codec_error(e: AnyDelimiterCodecError) -> AppError {
    match e {
        AnyDelimiterCodecError::MaxChunkLengthExceeded => {
            AppError::Protocol(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        AnyDelimiterCodecError::Io(io_err) => AppError::Connection(io_err.to_string()),
    }
}
