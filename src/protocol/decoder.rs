//! Stream Decoder
//!
//! [`Decoder`] pulls complete [`Value`]s out of any `AsyncRead`. It keeps
//! the bytes it has read but not yet consumed in a `BytesMut` buffer, so
//! pipelined requests and values split across TCP segments both work:
//! one call consumes exactly the bytes of one value and leaves the rest for
//! the next call.

use crate::protocol::parser::{ProtocolError, RespParser, MAX_BULK_SIZE};
use crate::protocol::types::Value;
use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Default upper bound on unparsed bytes held for one value
pub const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Errors produced while decoding from a stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reads one value at a time from an async byte stream.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
    buffer: BytesMut,
    parser: RespParser,
    /// Buffered bytes allowed before giving up on the current value
    max_buffer: usize,
    /// Bytes read from the stream since the last call to `take_bytes_read`
    bytes_read: usize,
}

impl<R: AsyncRead + Unpin> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_BUFFER_SIZE)
    }

    /// Creates a decoder that fails with [`ProtocolError::BufferFull`] once
    /// `max_buffer` bytes are buffered without completing a value.
    pub fn with_limit(reader: R, max_buffer: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE.min(max_buffer)),
            parser: RespParser::new(),
            max_buffer,
            bytes_read: 0,
        }
    }

    /// Decodes the next value, waiting for more bytes as needed.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between values.
    /// End of stream in the middle of a value is
    /// [`ProtocolError::UnexpectedEof`].
    pub async fn decode_next(&mut self) -> Result<Option<Value>, DecodeError> {
        loop {
            if !self.buffer.is_empty() {
                if let Some((value, consumed)) = self.parser.parse(&self.buffer)? {
                    self.buffer.advance(consumed);
                    trace!(
                        consumed = consumed,
                        remaining = self.buffer.len(),
                        "Decoded value"
                    );
                    return Ok(Some(value));
                }
                trace!(buffered = self.buffer.len(), "Incomplete value, need more data");
            }

            if self.buffer.len() >= self.max_buffer {
                return Err(ProtocolError::BufferFull(self.buffer.len()).into());
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ProtocolError::UnexpectedEof.into());
            }
            self.bytes_read += n;
        }
    }

    /// Returns and resets the count of bytes read from the stream.
    pub fn take_bytes_read(&mut self) -> usize {
        std::mem::take(&mut self.bytes_read)
    }

    /// Bytes received but not yet consumed by a decoded value.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
