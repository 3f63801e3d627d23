//! RESP Protocol Implementation
//!
//! This module implements the small RESP subset respkv speaks: simple
//! strings, errors, integers, bulk strings (including the null bulk) and
//! arrays.
//!
//! ## Modules
//!
//! - `types`: The `Value` enum and its encoder
//! - `parser`: Recursive, incremental parser over a byte buffer
//! - `decoder`: Drives the parser against an async stream
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{parse_message, Value};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! let reply = Value::ok().serialize();
//! assert_eq!(reply, b"+OK\r\n");
//! ```

pub mod decoder;
pub mod parser;
pub mod types;

pub use decoder::{DecodeError, Decoder};
pub use parser::{parse_message, ParseResult, ProtocolError, RespParser};
pub use types::Value;
