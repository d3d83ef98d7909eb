// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! A daemon running background workers and shutting them down in a defined
//! order.
//!
//! Every worker receives a [`ShutdownSignal`] and pulls its work through it;
//! on [`Daemon::shutdown`] the signals are triggered in ascending priority
//! order and each worker is awaited before the next one is signalled. Intake
//! stops before the parts it feeds, stores flush last.

use std::{future::Future, task::Poll};

use futures::{channel::oneshot, future::poll_fn, FutureExt, Stream, StreamExt};
use log::{debug, error, warn};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// A worker's view of the daemon shutdown.
///
/// The signal is always checked before the worker's own work source, so
/// stopping wins over a ready item.
pub struct ShutdownSignal {
    receiver: oneshot::Receiver<()>,
    triggered: bool,
}

impl ShutdownSignal {
    fn new(receiver: oneshot::Receiver<()>) -> Self {
        Self {
            receiver,
            triggered: false,
        }
    }

    /// Resolves once the daemon asks the worker to stop.
    pub async fn wait(&mut self) {
        if self.triggered {
            return;
        }

        let _ = (&mut self.receiver).await;
        self.triggered = true;
    }

    /// Returns the next item of `stream`, or `None` once the daemon asks the
    /// worker to stop or the stream ends.
    pub async fn drive<S: Stream + Unpin>(&mut self, stream: &mut S) -> Option<S::Item> {
        if self.triggered {
            return None;
        }

        poll_fn(|cx| {
            if self.receiver.poll_unpin(cx).is_ready() {
                self.triggered = true;
                return Poll::Ready(None);
            }

            stream.poll_next_unpin(cx)
        })
        .await
    }
}

struct Worker {
    name: &'static str,
    priority: u8,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A collection of background workers with ordered shutdown.
#[derive(Default)]
pub struct Daemon {
    workers: Mutex<Vec<Worker>>,
}

impl Daemon {
    /// Creates a new, empty `Daemon`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a background worker. The worker future receives the shutdown
    /// signal and is expected to return promptly once it resolves.
    pub fn spawn<F, Fut>(&self, name: &'static str, priority: u8, f: F)
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        debug!("Starting worker {}.", name);

        self.workers.lock().push(Worker {
            name,
            priority,
            shutdown: sender,
            handle: tokio::spawn(f(ShutdownSignal::new(receiver))),
        });
    }

    /// Signals and awaits all workers, lowest priority first.
    pub async fn shutdown(&self) {
        let mut workers = std::mem::take(&mut *self.workers.lock());
        workers.sort_by_key(|worker| worker.priority);

        for worker in workers {
            debug!("Stopping worker {}.", worker.name);

            if worker.shutdown.send(()).is_err() {
                warn!("Worker {} stopped before the shutdown signal.", worker.name);
            }

            if let Err(e) = worker.handle.await {
                error!("Worker {} panicked: {}.", worker.name, e);
            }
        }
    }
}
