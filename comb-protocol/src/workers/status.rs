// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use comb_runtime::daemon::Daemon;
use comb_storage::backend::StorageBackend;
use comb_tangle::Tangle;
use log::{error, info};
use tokio_stream::wrappers::IntervalStream;

use crate::{request::RequestQueue, workers::PRIORITY_STATUS};

const STATUS_INTERVAL: Duration = Duration::from_secs(1);
const FLUSH_EVERY_TICKS: u64 = 30;

/// The background task printing node status and periodically flushing the
/// tangle caches.
pub struct StatusWorker {}

impl StatusWorker {
    /// Spawns the status worker on the daemon.
    pub fn spawn<B: StorageBackend>(
        daemon: &Daemon,
        tangle: Arc<Tangle<B>>,
        request_queue: Arc<RequestQueue>,
        backlog: impl Fn() -> usize + Send + 'static,
    ) -> Self {
        daemon.spawn("Status", PRIORITY_STATUS, move |mut shutdown| async move {
            info!("Status worker running.");

            let mut ticker = IntervalStream::new(tokio::time::interval(STATUS_INTERVAL));
            let mut ticks: u64 = 0;

            while shutdown.drive(&mut ticker).await.is_some() {
                ticks += 1;

                let (queued, pending, processing) = request_queue.size();
                let lowest_queued = request_queue.peek().map(|request| *request.milestone_index).unwrap_or(0);

                info!(
                    "req(qu/pe/proc/lat): {:05}/{:05}/{:05}/{:04}ms, reqQMs: {}, processor: {:05}, LSMI/LMI: {}/{}",
                    queued,
                    pending,
                    processing,
                    request_queue.avg_latency(),
                    lowest_queued,
                    backlog(),
                    tangle.solid_milestone_index(),
                    tangle.latest_milestone_index(),
                );

                if ticks % FLUSH_EVERY_TICKS == 0 {
                    if let Err(e) = tangle.flush() {
                        error!("Flushing the tangle failed: {}.", e);
                    }
                }
            }

            info!("Status worker stopped.");
        });

        Self {}
    }
}
