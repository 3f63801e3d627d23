//! Incremental RESP Parser
//!
//! This module implements the parser for the RESP subset. It works on a
//! borrowed byte buffer and never blocks; the [`Decoder`] drives it against a
//! live stream.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((value, consumed)))` - Parsed one value using `consumed` bytes
//! - `Ok(None)` - The value is incomplete, more bytes are needed
//! - `Err(ProtocolError)` - The bytes can never form a valid value
//!
//! Arrays are tracked on an explicit stack of open frames, so a value is only
//! returned once every element it announced is present, and an array that
//! arrives over many reads is never decoded twice.
//!
//! [`Decoder`]: crate::protocol::Decoder

use crate::protocol::types::{prefix, Value, CRLF};
use bytes::Bytes;
use std::num::ParseIntError;
use thiserror::Error;

/// Malformed bytes on the wire. Always fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Leading byte is not one of the five known tags
    #[error("unknown type {}", describe_tag(.0))]
    UnknownType(u8),

    #[error("could not convert to integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a header, simple string or error line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative but not -1
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Bulk body not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("maximum nesting depth exceeded: {0}")]
    NestingTooDeep(usize),

    /// Stream ended in the middle of a value
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("read buffer limit exceeded: {0} bytes")]
    BufferFull(usize),
}

fn describe_tag(tag: &u8) -> String {
    if tag.is_ascii_graphic() {
        format!("'{}'", *tag as char)
    } else {
        format!("{:#04x}", tag)
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ProtocolError>;

/// Maximum size for a single bulk string (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum number of arrays open at once. The outermost array counts as one.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Incremental RESP parser.
///
/// A value that is still incomplete leaves its progress in the parser:
/// arrays already opened, elements already decoded, and where the search
/// for the next CRLF should resume. Feeding the same bytes again with more
/// appended only looks at the new part.
///
/// # Example
///
/// ```
/// use respkv::protocol::{RespParser, Value};
///
/// let mut parser = RespParser::new();
/// let buffer = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// assert!(parser.parse(&buffer[..10]).unwrap().is_none());
/// let (value, consumed) = parser.parse(buffer).unwrap().unwrap();
/// assert_eq!(consumed, buffer.len());
/// assert!(matches!(value, Value::Array(ref items) if items.len() == 2));
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Arrays opened but not yet complete, outermost first
    stack: Vec<Frame>,
    /// Bytes of the current value already consumed by finished items
    pos: usize,
    /// Where the CRLF search of the pending line resumes, relative to `pos`
    scan: usize,
}

/// An array whose elements are still arriving.
#[derive(Debug)]
struct Frame {
    expected: usize,
    elements: Vec<Value>,
}

/// One item read at the current position.
enum Item {
    Value(Value),
    /// Header of an array with this many elements
    Array(usize),
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to parse one value from the front of `buf`.
    ///
    /// After `Ok(None)` the next call must pass the same bytes, optionally
    /// followed by more. A returned value or error clears the saved progress.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Value, usize)>> {
        let result = self.resume(buf);
        if !matches!(result, Ok(None)) {
            self.reset();
        }
        result
    }

    /// Drops any partial progress.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.pos = 0;
        self.scan = 0;
    }

    fn resume(&mut self, buf: &[u8]) -> ParseResult<Option<(Value, usize)>> {
        loop {
            let rest = buf.get(self.pos..).unwrap_or_default();
            let (item, consumed) = match self.read_item(rest)? {
                Some(read) => read,
                None => return Ok(None),
            };
            self.pos += consumed;
            self.scan = 0;

            let mut value = match item {
                Item::Value(value) => value,
                Item::Array(count) => {
                    if self.stack.len() >= MAX_NESTING_DEPTH {
                        return Err(ProtocolError::NestingTooDeep(MAX_NESTING_DEPTH));
                    }
                    if count > 0 {
                        // The declared count is untrusted; don't preallocate
                        // past what the buffer could possibly hold.
                        let room = buf.len().saturating_sub(self.pos) / 3;
                        self.stack.push(Frame {
                            expected: count,
                            elements: Vec::with_capacity(count.min(room)),
                        });
                        continue;
                    }
                    Value::Array(Vec::new())
                }
            };

            // Fold the finished value into the arrays waiting for it.
            loop {
                let mut frame = match self.stack.pop() {
                    Some(frame) => frame,
                    None => return Ok(Some((value, self.pos))),
                };
                frame.elements.push(value);
                if frame.elements.len() < frame.expected {
                    self.stack.push(frame);
                    break;
                }
                value = Value::Array(frame.elements);
            }
        }
    }

    /// Reads one scalar value or array header from the front of `buf`.
    fn read_item(&mut self, buf: &[u8]) -> ParseResult<Option<(Item, usize)>> {
        let tag = match buf.first() {
            Some(tag) => *tag,
            None => return Ok(None),
        };

        match tag {
            prefix::SIMPLE_STRING => self.read_line(buf, Value::SimpleString),
            prefix::ERROR => self.read_line(buf, Value::Error),
            prefix::INTEGER => Ok(self
                .read_header(buf)?
                .map(|(n, consumed)| (Item::Value(Value::Integer(n)), consumed))),
            prefix::BULK_STRING => self.read_bulk_string(buf),
            prefix::ARRAY => self.read_array_header(buf),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    /// Parses `+<string>\r\n` or `-<message>\r\n`; `wrap` picks the variant.
    fn read_line(
        &mut self,
        buf: &[u8],
        wrap: fn(String) -> Value,
    ) -> ParseResult<Option<(Item, usize)>> {
        let end = match self.line_end(buf) {
            Some(end) => end,
            None => return Ok(None),
        };

        let s = std::str::from_utf8(&buf[1..end])
            .map_err(|e| ProtocolError::InvalidUtf8(e.to_string()))?;
        Ok(Some((Item::Value(wrap(s.to_string())), end + 2)))
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn read_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(Item, usize)>> {
        let (length, data_start) = match self.read_header(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length == -1 {
            return Ok(Some((Item::Value(Value::NullBulk), data_start)));
        }
        if length < 0 {
            return Err(ProtocolError::InvalidBulkLength(length));
        }

        let length = match usize::try_from(length) {
            Ok(n) if n <= MAX_BULK_SIZE => n,
            Ok(n) => return Err(too_large(n)),
            Err(_) => return Err(too_large(usize::MAX)),
        };

        let total_needed = data_start + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[data_start + length..total_needed] != CRLF {
            return Err(ProtocolError::MissingCrlf);
        }

        let data = Bytes::copy_from_slice(&buf[data_start..data_start + length]);
        Ok(Some((Item::Value(Value::BulkString(data)), total_needed)))
    }

    /// Parses an array header: `*<count>\r\n`
    fn read_array_header(&mut self, buf: &[u8]) -> ParseResult<Option<(Item, usize)>> {
        let (count, consumed) = match self.read_header(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let count =
            usize::try_from(count).map_err(|_| ProtocolError::InvalidArrayLength(count))?;
        Ok(Some((Item::Array(count), consumed)))
    }

    /// Reads the signed decimal header that follows a tag byte.
    ///
    /// Returns the number and the offset just past its CRLF.
    fn read_header(&mut self, buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
        let end = match self.line_end(buf) {
            Some(end) => end,
            None => return Ok(None),
        };

        let text = std::str::from_utf8(&buf[1..end])
            .map_err(|e| ProtocolError::InvalidUtf8(e.to_string()))?;
        let n: i64 = text
            .parse()
            .map_err(|e: ParseIntError| ProtocolError::InvalidInteger(e.to_string()))?;

        Ok(Some((n, end + 2)))
    }

    /// Position of the CR ending the line that starts after the tag byte.
    ///
    /// Bytes already searched on an earlier call are skipped.
    fn line_end(&mut self, buf: &[u8]) -> Option<usize> {
        let from = self.scan.max(1).min(buf.len());
        match find_crlf(&buf[from..]) {
            Some(pos) => Some(from + pos),
            None => {
                // A trailing CR may still be completed by the next byte.
                self.scan = buf.len().saturating_sub(1);
                None
            }
        }
    }
}

fn too_large(size: usize) -> ProtocolError {
    ProtocolError::MessageTooLarge {
        size,
        max: MAX_BULK_SIZE,
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Parses a single message from bytes with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(Value, usize)>> {
    RespParser::new().parse(buf)
}
