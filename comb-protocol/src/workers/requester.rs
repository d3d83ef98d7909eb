// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use comb_runtime::daemon::Daemon;
use log::info;
use tokio_stream::wrappers::IntervalStream;

use crate::{
    metrics::ServerMetrics,
    packet::{MessageRequestPacket, Packet},
    peer::PeerManager,
    request::RequestQueue,
    workers::PRIORITY_REQUESTER,
};

const DISPATCH_INTERVAL: Duration = Duration::from_millis(100);
const TIMEOUT_CHECK_EVERY_TICKS: u64 = 10;

/// The worker dispatching queued requests to peers and requeueing the ones
/// that timed out.
pub struct RequesterWorker {}

impl RequesterWorker {
    /// Spawns the requester worker on the daemon.
    pub fn spawn(
        daemon: &Daemon,
        request_queue: Arc<RequestQueue>,
        peer_manager: Arc<PeerManager>,
        metrics: Arc<ServerMetrics>,
        request_timeout: Duration,
    ) -> Self {
        daemon.spawn("Requester", PRIORITY_REQUESTER, move |mut shutdown| async move {
            info!("Requester worker running.");

            let mut ticker = IntervalStream::new(tokio::time::interval(DISPATCH_INTERVAL));
            let mut ticks: u64 = 0;

            while shutdown.drive(&mut ticker).await.is_some() {
                ticks += 1;

                // Without peers, dispatching would only burn the queued state.
                if !peer_manager.is_empty() {
                    while let Some(request) = request_queue.next() {
                        let frame = MessageRequestPacket::new(request.message_id).to_frame();

                        if peer_manager.send_to_random(frame) {
                            metrics.message_requests_sent_inc();
                        } else {
                            break;
                        }
                    }
                }

                if ticks % TIMEOUT_CHECK_EVERY_TICKS == 0 {
                    let requeued = request_queue.requeue_timed_out(request_timeout);
                    if requeued > 0 {
                        info!("Requeued {} timed out requests.", requeued);
                    }
                }
            }

            info!("Requester worker stopped.");
        });

        Self {}
    }
}
