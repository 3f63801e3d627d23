//! RESP Wire Values
//!
//! This module defines [`Value`], one decoded unit of the RESP subset the
//! server speaks, and the encoder that turns a value back into wire bytes.
//!
//! ## Protocol Format
//!
//! Each unit starts with a one-byte tag and a CRLF-terminated header line:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String (`$-1` is the null bulk string)
//! - `*` Array
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR: key 'foo' not found\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Empty Bulk String: `$0\r\n\r\n`
//! Null Bulk String: `$-1\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One decoded wire unit.
///
/// Values are immutable once built. `NullBulk` (`$-1`) and an empty
/// `BulkString` (`$0`) are distinct values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Line-oriented text. Cannot contain CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Same shape as a simple string but flags an error condition.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe, length-prefixed payload.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// The null bulk string.
    /// Format: `$-1\r\n`
    NullBulk,

    /// Ordered sequence of values, possibly nested.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<Value>),
}

impl Value {
    /// Creates a simple string. CR and LF are replaced with spaces so the
    /// line framing cannot be broken by the content.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::Value;
    /// let ok = Value::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        Value::SimpleString(single_line(s.into()))
    }

    /// Creates an error value, with the same line sanitising as
    /// [`Value::simple_string`].
    pub fn error(s: impl Into<String>) -> Self {
        Value::Error(single_line(s.into()))
    }

    /// Creates a bulk string.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::Value;
    /// use bytes::Bytes;
    /// let bulk = Value::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        Value::BulkString(data.into())
    }

    /// Reply sent for successful commands that produce no result
    pub fn ok() -> Self {
        Value::SimpleString("OK".to_string())
    }

    /// Serializes the value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Value::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Value::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Value::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Value::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Value::NullBulk => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Value::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Reads the value as text. Only simple strings and UTF-8 bulk strings
    /// qualify; errors, integers and the null bulk do not.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::SimpleString(s) => Some(s),
            Value::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

fn single_line(s: String) -> String {
    if s.contains(['\r', '\n']) {
        s.replace(['\r', '\n'], " ")
    } else {
        s
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::SimpleString(s) => write!(f, "{}", s),
            Value::Error(s) => write!(f, "(error) {}", s),
            Value::Integer(n) => write!(f, "(integer) {}", n),
            Value::BulkString(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Value::NullBulk => write!(f, "(nil)"),
            Value::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    for (i, v) in values.iter().enumerate() {
                        if i > 0 {
                            writeln!(f)?;
                        }
                        write!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
