//! Connection Handler Module
//!
//! This module manages individual client connections. Each connection is
//! handled by its own async task and talks to the shared [`Store`] only
//! through its request queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Server accept loop                      │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ spawn task per connection
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐   ┌──────────┐   ┌─────────┐   ┌───────┐  │
//! │  │ Decoder     │──>│ dispatch │──>│ execute │──>│ reply │  │
//! │  └─────────────┘   └──────────┘   └─────────┘   └───────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Store`]: crate::storage::Store

pub mod handler;
pub mod reply;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
pub use reply::{error_reply, success_reply};
