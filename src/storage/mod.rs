//! Storage Module
//!
//! This module provides the in-memory key-value store behind respkv.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Store handle (Clone)   Store handle   Store handle         │
//! │        │                     │              │               │
//! │        └──────── request queue (mpsc) ──────┘               │
//! │                          │                                  │
//! │                          ▼                                  │
//! │              ┌───────────────────────┐                      │
//! │              │  Worker task          │                      │
//! │              │  owns HashMap         │──> oneshot replies   │
//! │              └───────────────────────┘                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use respkv::commands::Argument;
//! use respkv::storage::Store;
//! use tokio::sync::watch;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (_lifecycle, signal) = watch::channel(false);
//! let store = Store::new();
//! store.start(signal);
//!
//! store.set("name", Argument::from("Ariz")).await.unwrap();
//! let value = store.get("name").await.unwrap();
//! assert_eq!(value, Some(Argument::from("Ariz")));
//!
//! store.shutdown();
//! # }
//! ```

pub mod store;

pub use store::{StorageError, Store};
