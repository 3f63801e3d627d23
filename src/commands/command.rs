//! Executable commands.
//!
//! A [`Command`] is a validated name plus its positional arguments. Each
//! executor checks arity and argument types itself before touching the
//! store, so a bad argument never reaches the worker.

use crate::commands::Argument;
use crate::storage::{StorageError, Store};
use thiserror::Error;
use tracing::debug;

/// The fixed set of supported command names. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Get,
    Set,
    Quit,
    /// Handshake probe some clients send; accepted and ignored
    Client,
    /// Handshake probe some clients send; accepted and ignored
    Command,
}

impl CommandName {
    /// Resolves an exact uppercase name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(CommandName::Get),
            "SET" => Some(CommandName::Set),
            "QUIT" => Some(CommandName::Quit),
            "CLIENT" => Some(CommandName::Client),
            "COMMAND" => Some(CommandName::Command),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Get => "GET",
            CommandName::Set => "SET",
            CommandName::Quit => "QUIT",
            CommandName::Client => "CLIENT",
            CommandName::Command => "COMMAND",
        }
    }
}

/// Failures reported to the client. None of them close the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("incorrect number of arguments for '{command}': expected {expected}, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("could not convert {found} argument {position} of '{command}' to string")]
    WrongType {
        command: &'static str,
        position: usize,
        found: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a successful execution. `None` is replied to as `OK`.
pub type CommandOutput = Option<Argument>;

/// A dispatched command, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: CommandName,
    args: Vec<Argument>,
}

impl Command {
    pub fn new(name: CommandName, args: Vec<Argument>) -> Self {
        Self { name, args }
    }

    pub fn name(&self) -> CommandName {
        self.name
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Stop commands close the connection after a successful reply.
    pub fn is_stop(&self) -> bool {
        self.name == CommandName::Quit
    }

    /// Runs the command against `store`.
    pub async fn execute(self, store: &Store) -> Result<CommandOutput, CommandError> {
        let output = match self.name {
            CommandName::Get => get(store, self.args).await,
            CommandName::Set => set(store, self.args).await,
            CommandName::Quit | CommandName::Client | CommandName::Command => Ok(None),
        };
        debug!(command = self.name.as_str(), ok = output.is_ok(), "Executed command");
        output
    }
}

/// GET key
async fn get(store: &Store, args: Vec<Argument>) -> Result<CommandOutput, CommandError> {
    let [key] = expect_args::<1>(CommandName::Get, args)?;
    let key = expect_key(CommandName::Get, &key)?;
    Ok(store.get(key).await?)
}

/// SET key value
async fn set(store: &Store, args: Vec<Argument>) -> Result<CommandOutput, CommandError> {
    let [key, value] = expect_args::<2>(CommandName::Set, args)?;
    let key = expect_key(CommandName::Set, &key)?;
    store.set(key, value).await?;
    Ok(None)
}

fn expect_args<const N: usize>(
    name: CommandName,
    args: Vec<Argument>,
) -> Result<[Argument; N], CommandError> {
    let got = args.len();
    args.try_into().map_err(|_| CommandError::WrongArity {
        command: name.as_str(),
        expected: N,
        got,
    })
}

fn expect_key(name: CommandName, arg: &Argument) -> Result<String, CommandError> {
    arg.as_str()
        .map(str::to_owned)
        .ok_or_else(|| CommandError::WrongType {
            command: name.as_str(),
            position: 1,
            found: arg.kind(),
        })
}
