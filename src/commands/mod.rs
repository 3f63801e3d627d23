//! Command Module
//!
//! This module turns decoded requests into work against the store.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Decoder        │  (protocol module)
//! └────────┬────────┘
//!          │ Value
//!          ▼
//! ┌─────────────────┐
//! │  dispatch()     │  RootNotArray / MissingCommandName /
//! │                 │  UnsupportedCommand
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │  execute()      │  WrongArity / WrongType / NotFound
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Store          │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key`
//! - `SET key value`
//! - `QUIT` (replies `OK`, then the connection closes)
//! - `CLIENT ...`, `COMMAND ...` (accepted and ignored)

pub mod argument;
pub mod command;
pub mod dispatch;

pub use argument::Argument;
pub use command::{Command, CommandError, CommandName, CommandOutput};
pub use dispatch::{dispatch, DispatchError};
