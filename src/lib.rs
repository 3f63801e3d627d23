//! # respkv - A Minimal RESP Key-Value Server
//!
//! respkv is an in-memory key-value server reachable over TCP. Clients send
//! commands encoded in a small subset of RESP (the Redis Serialization
//! Protocol); the server decodes them, runs them against the store and
//! replies in the same encoding.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              respkv                                 │
//! │                                                                     │
//! │  ┌─────────────┐    ┌───────────────────────────────────────────┐   │
//! │  │ TCP Server  │───>│ ConnectionHandler (one task per client)   │   │
//! │  │ accept loop │    │  Decoder → dispatch → Command::execute    │   │
//! │  └─────────────┘    └─────────────────────┬─────────────────────┘   │
//! │                                           │ request + oneshot       │
//! │                                           ▼                         │
//! │                     ┌───────────────────────────────────────────┐   │
//! │                     │ Store worker (sole owner of the HashMap)  │   │
//! │                     └───────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use respkv::connection::ConnectionStats;
//! use respkv::server::Server;
//! use respkv::storage::Store;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (_lifecycle, signal) = watch::channel(false);
//!     let store = Store::new();
//!     store.start(signal);
//!
//!     let server = Server::new(store, Arc::new(ConnectionStats::new()));
//!     let _ = server.listen_and_serve("127.0.0.1:6379").await;
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `GET key`
//! - `SET key value`
//! - `QUIT`
//! - `CLIENT ...` / `COMMAND ...` (accepted as no-ops for client handshakes)
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP values, parser, stream decoder and encoder
//! - [`commands`]: Dispatch and command executors
//! - [`storage`]: The single-writer store actor
//! - [`connection`]: Per-client connection loop and reply encoding
//! - [`server`]: Accept loop and shutdown
//! - [`config`]: Flags for the server and client binaries

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{dispatch, Argument, Command, CommandError, DispatchError};
pub use connection::{handle_connection, ConnectionHandler, ConnectionStats};
pub use protocol::{Decoder, ProtocolError, RespParser, Value};
pub use server::{Server, ServerError};
pub use storage::{StorageError, Store};

/// Version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
