//! TCP Server
//!
//! Accepts connections and spawns one [`ConnectionHandler`] task per client.
//!
//! Shutdown only stops the accept loop. Connections that were already
//! accepted keep running until the client disconnects, sends QUIT, or hits
//! an error; the caller decides how long to wait for them.
//!
//! [`ConnectionHandler`]: crate::connection::ConnectionHandler

use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed listen address {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Returned by the accept loop once [`Server::shutdown`] has been called
    #[error("server closed")]
    Closed,
}

/// Accept loop plus its one-shot done signal.
#[derive(Debug)]
pub struct Server {
    store: Store,
    stats: Arc<ConnectionStats>,
    closed: AtomicBool,
    done: watch::Sender<bool>,
}

impl Server {
    pub fn new(store: Store, stats: Arc<ConnectionStats>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            store,
            stats,
            closed: AtomicBool::new(false),
            done,
        }
    }

    /// Counters shared by every connection this server accepted.
    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    /// Binds `addr` and serves until shut down.
    pub async fn listen_and_serve(&self, addr: &str) -> Result<(), ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        debug!(addr = %addr, "Bind and ready");
        self.serve(listener).await
    }

    /// Runs the accept loop on an already-bound listener.
    ///
    /// Never returns `Ok`: the loop ends with [`ServerError::Closed`] once
    /// the server is shut down, even if that happened before the call.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut done = self.done.subscribe();

        loop {
            tokio::select! {
                biased;
                _ = closed(&mut done) => {
                    info!("Server stopped accepting connections");
                    return Err(ServerError::Closed);
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let store = self.store.clone();
                        let stats = Arc::clone(&self.stats);
                        tokio::spawn(handle_connection(stream, addr, store, stats));
                    }
                    // Dropped on purpose: log and keep accepting.
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
            }
        }
    }

    /// Stops the accept loop. Safe to call any number of times.
    pub fn shutdown(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.done.send_replace(true);
            info!("Server shutdown requested");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

async fn closed(done: &mut watch::Receiver<bool>) {
    // The sender lives in `Server`, so this only errors once it is gone.
    let _ = done.wait_for(|closed| *closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    async fn start_server() -> (
        Arc<Server>,
        SocketAddr,
        JoinHandle<Result<(), ServerError>>,
        watch::Sender<bool>,
    ) {
        let (lifecycle, rx) = watch::channel(false);
        let store = Store::new();
        store.start(rx);

        let server = Arc::new(Server::new(store, Arc::new(ConnectionStats::new())));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let serving = Arc::clone(&server);
        let task = tokio::spawn(async move { serving.serve(listener).await });

        (server, addr, task, lifecycle)
    }

    async fn roundtrip(client: &mut TcpStream, request: &[u8], expected: &[u8]) {
        client.write_all(request).await.unwrap();
        let mut buf = vec![0u8; expected.len()];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected);
    }

    #[tokio::test]
    async fn test_serves_connections() {
        let (_server, addr, _task, _lifecycle) = start_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$4\r\nAriz\r\n",
            b"+OK\r\n",
        )
        .await;

        let mut other = TcpStream::connect(addr).await.unwrap();
        roundtrip(&mut other, b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n", b"+Ariz\r\n").await;
    }

    #[tokio::test]
    async fn test_stats_cover_accepted_connections() {
        let (server, addr, _task, _lifecycle) = start_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n",
            b"+OK\r\n",
        )
        .await;

        let stats = server.stats();
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);

        drop(client);
        timeout(Duration::from_secs(1), async {
            while stats.active_connections.load(Ordering::Relaxed) > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_shutdown_stops_accept_loop_only() {
        let (server, addr, task, _lifecycle) = start_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        roundtrip(
            &mut client,
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n",
            b"+OK\r\n",
        )
        .await;

        server.shutdown();
        server.shutdown();
        let result = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert!(matches!(result, Err(ServerError::Closed)));
        assert!(server.is_closed());

        // The accepted connection is not severed.
        roundtrip(&mut client, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n", b"+v\r\n").await;
    }

    #[tokio::test]
    async fn test_shutdown_before_serve() {
        let server = Server::new(Store::new(), Arc::new(ConnectionStats::new()));
        server.shutdown();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = timeout(Duration::from_secs(1), server.serve(listener))
            .await
            .unwrap();
        assert!(matches!(result, Err(ServerError::Closed)));
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let server = Server::new(Store::new(), Arc::new(ConnectionStats::new()));
        let result = server.listen_and_serve(&addr).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
