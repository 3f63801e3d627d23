//! Connection Handler Module
//!
//! This module handles individual client connections. Each client gets its
//! own task that loops through decode, dispatch, execute and reply until the
//! connection closes.
//!
//! ## Connection Lifecycle
//!
//! ```text
//!        ┌──────────────────────────────────────────────┐
//!        ▼                                              │
//!    Reading ──> Dispatching ──> Executing ──> Replying ─┘
//!       │             │                           │
//!       │ EOF         │ DispatchError             │ QUIT
//!       │ (no reply)  │ (error reply)             │ (after OK)
//!       │ decode err  │                           │
//!       │ (error reply)                           │
//!       ▼             ▼                           ▼
//!     Closed        Closed                      Closed
//! ```
//!
//! Command failures (wrong arity, wrong type, missing key) get an error
//! reply and the loop goes back to Reading. A failed socket write closes the
//! connection from any state.

use crate::commands::{dispatch, DispatchError};
use crate::connection::reply::{error_reply, success_reply};
use crate::protocol::{DecodeError, Decoder, ProtocolError, Value};
use crate::storage::Store;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands executed, failed or not
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Why a connection ended other than a clean EOF or QUIT.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue, including failed reply writes)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl From<DecodeError> for ConnectionError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Protocol(e) => ConnectionError::Protocol(e),
            DecodeError::Io(e) => ConnectionError::Io(e),
        }
    }
}

/// Drives one client connection.
pub struct ConnectionHandler<S> {
    decoder: Decoder<ReadHalf<S>>,
    writer: BufWriter<WriteHalf<S>>,

    /// Client's address (for logging)
    addr: SocketAddr,

    store: Store,
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S, addr: SocketAddr, store: Store, stats: Arc<ConnectionStats>) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        Self {
            decoder: Decoder::new(reader),
            writer: BufWriter::new(writer),
            addr,
            store,
            stats,
        }
    }

    /// Runs the connection until it closes.
    ///
    /// `Ok(())` covers a clean EOF and a QUIT; everything else is the error
    /// that closed the connection.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        self.stats.connection_opened();
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed with error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let value = match self.decoder.decode_next().await {
                Ok(Some(value)) => value,
                Ok(None) => return Ok(()),
                Err(e) => {
                    // Best effort; the decode error is what gets reported.
                    let _ = self.send_reply(&error_reply(&e)).await;
                    return Err(e.into());
                }
            };
            self.stats.bytes_read(self.decoder.take_bytes_read());

            let command = match dispatch(value) {
                Ok(command) => command,
                Err(e) => {
                    self.send_reply(&error_reply(&e)).await?;
                    return Err(e.into());
                }
            };

            let stop = command.is_stop();
            let name = command.name();
            let result = command.execute(&self.store).await;
            self.stats.command_processed();

            let reply = match &result {
                Ok(output) => success_reply(output),
                Err(e) => {
                    debug!(client = %self.addr, command = name.as_str(), error = %e, "Command failed");
                    error_reply(e)
                }
            };
            self.send_reply(&reply).await?;

            if stop && result.is_ok() {
                debug!(client = %self.addr, "Stop command received, closing");
                return Ok(());
            }
        }
    }

    async fn send_reply(&mut self, reply: &Value) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent reply");
        Ok(())
    }
}

/// Handles a client connection to completion.
///
/// Errors are already logged by [`ConnectionHandler::run`].
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    store: Store,
    stats: Arc<ConnectionStats>,
) {
    let _ = ConnectionHandler::new(stream, addr, store, stats).run().await;
}
