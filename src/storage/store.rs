//! Single-Writer Store
//!
//! The key-value map is owned by one worker task. Callers never touch it:
//! every [`Store::get`] and [`Store::set`] becomes a [`Request`] on a bounded
//! queue, carrying a private `oneshot` reply slot the caller waits on.
//!
//! ```text
//!  conn task ──┐
//!  conn task ──┼──> mpsc queue ──> worker (owns HashMap) ──> oneshot reply
//!  conn task ──┘
//! ```
//!
//! Because exactly one task reads and writes the map, there is no lock on
//! it, writes to one key apply in arrival order (last write wins), and no
//! caller can observe a half-applied SET.
//!
//! ## Lifecycle
//!
//! `new` → `start` (spawns the worker) → serving → stopped by either
//! [`Store::shutdown`] or the lifecycle signal passed to `start`. Once
//! stopped, calls return immediately with the closed result instead of
//! waiting for a reply that will never come.

use crate::commands::Argument;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Capacity of the request queue
const QUEUE_CAPACITY: usize = 1024;

/// Errors returned by store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("key '{0}' not found")]
    NotFound(String),
}

type Responder<T> = oneshot::Sender<Result<T, StorageError>>;

/// A unit of work for the worker.
#[derive(Debug)]
enum Request {
    Get {
        key: String,
        resp: Responder<Argument>,
    },
    Set {
        key: String,
        value: Argument,
        resp: Responder<()>,
    },
}

/// One-shot closed state shared by every handle and the worker.
#[derive(Debug)]
struct Closer {
    closed: AtomicBool,
    done: watch::Sender<bool>,
}

impl Closer {
    /// Returns true only for the call that performed the transition.
    fn close(&self) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.done.send_replace(true);
        true
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct Shared {
    requests: mpsc::Sender<Request>,
    /// Queue receiver waiting for `start` to hand it to the worker.
    ///
    /// Only `start` and `shutdown` lock this, each taking the receiver at
    /// most once. `get` and `set` never touch it, and the worker owns the
    /// map outright.
    pending: Mutex<Option<mpsc::Receiver<Request>>>,
    closer: Arc<Closer>,
}

impl Shared {
    fn take_pending(&self) -> Option<mpsc::Receiver<Request>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Handle to the single-writer key-value store.
///
/// Cloning is cheap; every clone talks to the same worker.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Shared>,
}

impl Store {
    /// Creates an empty store. No worker runs until [`Store::start`].
    ///
    /// Requests issued before `start` are queued and answered once the
    /// worker is running.
    pub fn new() -> Self {
        let (requests, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let (done, _) = watch::channel(false);

        Self {
            inner: Arc::new(Shared {
                requests,
                pending: Mutex::new(Some(receiver)),
                closer: Arc::new(Closer {
                    closed: AtomicBool::new(false),
                    done,
                }),
            }),
        }
    }

    /// Spawns the worker. It stops when [`Store::shutdown`] is called or
    /// when `lifecycle` turns `true`.
    ///
    /// Returns `None` if the store was already started or already shut down.
    pub fn start(&self, lifecycle: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let requests = self.inner.take_pending()?;

        let worker = Worker {
            data: HashMap::new(),
            requests,
            done: self.inner.closer.done.subscribe(),
            lifecycle,
            closer: Arc::clone(&self.inner.closer),
        };

        debug!("Store worker starting");
        Some(tokio::spawn(worker.run()))
    }

    /// Stops the store. Safe to call any number of times from any task.
    pub fn shutdown(&self) {
        if self.inner.closer.close() {
            info!("Store shut down");
        }
        // Never started: drop the queue so queued callers are released.
        drop(self.inner.take_pending());
    }

    /// Returns true once the store has been shut down.
    pub fn is_closed(&self) -> bool {
        self.inner.closer.is_closed()
    }

    /// Looks up `key`.
    ///
    /// Returns `Ok(Some(value))` when set, [`StorageError::NotFound`] when
    /// never set, and `Ok(None)` when the store is closed.
    pub async fn get(&self, key: impl Into<String>) -> Result<Option<Argument>, StorageError> {
        let (resp, reply) = oneshot::channel();
        let request = Request::Get {
            key: key.into(),
            resp,
        };

        if !self.submit(request).await {
            return Ok(None);
        }
        match reply.await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// A closed store drops the write and still returns `Ok(())`.
    pub async fn set(&self, key: impl Into<String>, value: Argument) -> Result<(), StorageError> {
        let (resp, reply) = oneshot::channel();
        let request = Request::Set {
            key: key.into(),
            value,
            resp,
        };

        if !self.submit(request).await {
            return Ok(());
        }
        reply.await.unwrap_or(Ok(()))
    }

    /// Queues a request. False means the store is closed.
    async fn submit(&self, request: Request) -> bool {
        if self.is_closed() {
            trace!("Store closed, dropping request");
            return false;
        }
        self.inner.requests.send(request).await.is_ok()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Sole owner of the map.
struct Worker {
    data: HashMap<String, Argument>,
    requests: mpsc::Receiver<Request>,
    done: watch::Receiver<bool>,
    lifecycle: watch::Receiver<bool>,
    closer: Arc<Closer>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = fired(&mut self.done) => {
                    debug!("Store worker stopped by shutdown");
                    break;
                }
                _ = fired(&mut self.lifecycle) => {
                    debug!("Store worker stopped by lifecycle signal");
                    if self.closer.close() {
                        info!("Store shut down");
                    }
                    break;
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.apply(request),
                    None => {
                        debug!("All store handles dropped, worker exiting");
                        break;
                    }
                },
            }
        }
        // Dropping `self.requests` here closes the queue; anything still
        // queued is dropped and its caller sees the closed result.
    }

    fn apply(&mut self, request: Request) {
        match request {
            Request::Get { key, resp } => {
                let result = match self.data.get(&key) {
                    Some(value) => Ok(value.clone()),
                    None => Err(StorageError::NotFound(key)),
                };
                let _ = resp.send(result);
            }
            Request::Set { key, value, resp } => {
                trace!(key = %key, "Store set");
                self.data.insert(key, value);
                let _ = resp.send(Ok(()));
            }
        }
    }
}

/// Resolves once `signal` reads `true`. A signal whose sender is gone can
/// never fire, so it pends forever.
async fn fired(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|fired| *fired).await.is_err() {
        std::future::pending::<()>().await;
    }
}
