//! Reply encoding.
//!
//! Every reply is a single line: `+<text>\r\n` on success, `-ERR: <message>\r\n`
//! on failure. There is no structured error channel; errors are flattened to
//! their display text.

use crate::commands::CommandOutput;
use crate::protocol::Value;
use std::fmt::Display;

/// Prefix placed before every error message on the wire
pub const ERROR_PREFIX: &str = "ERR: ";

/// Reply for a successful command: the stringified result, or `OK` when
/// there is none.
pub fn success_reply(output: &CommandOutput) -> Value {
    match output {
        Some(result) => Value::simple_string(result.to_string()),
        None => Value::ok(),
    }
}

/// Reply carrying an error's message.
pub fn error_reply(err: &dyn Display) -> Value {
    Value::error(format!("{}{}", ERROR_PREFIX, err))
}
