//! Command arguments.
//!
//! Arguments are the unwrapped payloads of the array elements that follow a
//! command name. They keep the variant they arrived as, so executors can
//! check types explicitly instead of guessing from raw bytes.

use crate::protocol::Value;
use bytes::Bytes;
use std::fmt;

/// One positional argument, mirroring the [`Value`] variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    NullBulk,
    Array(Vec<Argument>),
}

impl Argument {
    /// Reads the argument as a string key. Simple strings and UTF-8 bulk
    /// strings qualify.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::Simple(s) => Some(s),
            Argument::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Argument::Simple(_) => "simple string",
            Argument::Error(_) => "error",
            Argument::Integer(_) => "integer",
            Argument::Bulk(b) if std::str::from_utf8(b).is_err() => "binary bulk string",
            Argument::Bulk(_) => "bulk string",
            Argument::NullBulk => "null",
            Argument::Array(_) => "array",
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        match value {
            Value::SimpleString(s) => Argument::Simple(s),
            Value::Error(s) => Argument::Error(s),
            Value::Integer(n) => Argument::Integer(n),
            Value::BulkString(b) => Argument::Bulk(b),
            Value::NullBulk => Argument::NullBulk,
            Value::Array(items) => Argument::Array(items.into_iter().map(Argument::from).collect()),
        }
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::Bulk(Bytes::copy_from_slice(s.as_bytes()))
    }
}

/// Renders the payload the way a GET reply carries it.
impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Simple(s) | Argument::Error(s) => f.write_str(s),
            Argument::Integer(n) => write!(f, "{}", n),
            Argument::Bulk(b) => f.write_str(&String::from_utf8_lossy(b)),
            Argument::NullBulk => f.write_str("(nil)"),
            Argument::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}
