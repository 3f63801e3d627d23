//! Turns a decoded [`Value`] into a [`Command`].

use crate::commands::{Argument, Command, CommandName};
use crate::protocol::Value;
use thiserror::Error;

/// Request shapes that cannot become a command. Fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("root value is not an array")]
    RootNotArray,

    #[error("could not get command name")]
    MissingCommandName,

    #[error("unsupported command: '{0}' (use uppercase instead)")]
    UnsupportedCommand(String),
}

/// Builds a command from a top-level value.
///
/// The first array element names the command; the rest become its
/// arguments, unwrapped but otherwise untouched.
pub fn dispatch(value: Value) -> Result<Command, DispatchError> {
    let mut items = match value {
        Value::Array(items) => items.into_iter(),
        _ => return Err(DispatchError::RootNotArray),
    };

    let name = items
        .next()
        .as_ref()
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(DispatchError::MissingCommandName)?;

    let name = CommandName::parse(&name).ok_or(DispatchError::UnsupportedCommand(name))?;
    let args = items.map(Argument::from).collect();

    Ok(Command::new(name, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::bulk_string(s.to_string())).collect())
    }

    #[test]
    fn test_dispatch_set() {
        let cmd = dispatch(array(&["SET", "foo", "bar"])).unwrap();
        assert_eq!(cmd.name(), CommandName::Set);
        assert_eq!(cmd.args(), &[Argument::from("foo"), Argument::from("bar")]);
        assert!(!cmd.is_stop());
    }

    #[test]
    fn test_simple_string_name() {
        let value = Value::Array(vec![Value::simple_string("QUIT")]);
        let cmd = dispatch(value).unwrap();
        assert!(cmd.is_stop());
        assert!(cmd.args().is_empty());
    }

    #[test]
    fn test_root_not_array() {
        assert_eq!(
            dispatch(Value::simple_string("GET")),
            Err(DispatchError::RootNotArray)
        );
        assert_eq!(dispatch(Value::NullBulk), Err(DispatchError::RootNotArray));
    }

    #[test]
    fn test_missing_command_name() {
        assert_eq!(
            dispatch(Value::Array(vec![])),
            Err(DispatchError::MissingCommandName)
        );
        assert_eq!(
            dispatch(Value::Array(vec![Value::Integer(1)])),
            Err(DispatchError::MissingCommandName)
        );
        assert_eq!(
            dispatch(Value::Array(vec![Value::NullBulk])),
            Err(DispatchError::MissingCommandName)
        );
    }

    #[test]
    fn test_unsupported_command_names_literal() {
        let err = dispatch(array(&["FOO"])).unwrap_err();
        assert_eq!(err, DispatchError::UnsupportedCommand("FOO".to_string()));

        let err = dispatch(array(&["get", "k"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported command: 'get' (use uppercase instead)"
        );
    }

    #[test]
    fn test_arguments_keep_their_variant() {
        let value = Value::Array(vec![
            Value::bulk_string("SET"),
            Value::simple_string("k"),
            Value::Array(vec![Value::Integer(1), Value::NullBulk]),
        ]);
        let cmd = dispatch(value).unwrap();
        assert_eq!(
            cmd.args(),
            &[
                Argument::Simple("k".to_string()),
                Argument::Array(vec![Argument::Integer(1), Argument::NullBulk]),
            ]
        );
    }

    #[test]
    fn test_handshake_probes() {
        let cmd = dispatch(array(&["COMMAND", "DOCS"])).unwrap();
        assert_eq!(cmd.name(), CommandName::Command);
        let cmd = dispatch(array(&["CLIENT", "SETNAME", "x"])).unwrap();
        assert_eq!(cmd.name(), CommandName::Client);
    }
}
