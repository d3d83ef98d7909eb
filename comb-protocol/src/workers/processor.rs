// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use comb_message::{
    packable::Packable,
    payload::Payload,
    Message, MessageId,
};
use comb_runtime::{daemon::Daemon, event::Bus};
use comb_storage::backend::StorageBackend;
use comb_tangle::{MessageMetadata, MilestoneIndex, Tangle};
use crypto::hashes::{blake2b::Blake2b256, Digest};
use log::{error, info, trace};
use tokio::sync::Notify;

use crate::{
    event::{KnownMessage, NewMessage},
    metrics::ServerMetrics,
    peer::{PeerId, PeerManager},
    request::RequestQueue,
    workers::{
        unix_now_secs, MilestonePayloadWorker, MilestonePayloadWorkerEvent, MilestoneSolidifierWorker,
        MilestoneSolidifierWorkerEvent, PRIORITY_PROCESSOR,
    },
    Error,
};

const QUEUE_CAPACITY: usize = 10_000;

/// One unit of intake work: the raw bytes of a message, where they came from,
/// and the milestone index of the originating request, if any.
pub struct ProcessorWorkerEvent {
    /// The undecoded message bytes.
    pub bytes: Vec<u8>,
    /// The peer the bytes arrived from; `None` for locally submitted messages.
    pub from: Option<PeerId>,
    /// The milestone index of the request this message answers, if any.
    pub requested: Option<MilestoneIndex>,
}

/// The intake worker pool: decode, deduplicate, persist, emit.
pub struct ProcessorWorker {
    tx: async_channel::Sender<ProcessorWorkerEvent>,
}

impl ProcessorWorker {
    /// Spawns `2 × logical cores` intake workers on the daemon.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<B: StorageBackend>(
        daemon: &Daemon,
        tangle: Arc<Tangle<B>>,
        request_queue: Arc<RequestQueue>,
        peer_manager: Arc<PeerManager>,
        metrics: Arc<ServerMetrics>,
        bus: Arc<Bus<'static>>,
        milestone_payload: &MilestonePayloadWorker,
        solidifier: &MilestoneSolidifierWorker,
        fatal: Arc<Notify>,
    ) -> Self {
        let (tx, rx) = async_channel::bounded(QUEUE_CAPACITY);
        let worker_count = 2 * num_cpus::get();

        for _ in 0..worker_count {
            let rx = rx.clone();
            let tangle = tangle.clone();
            let request_queue = request_queue.clone();
            let peer_manager = peer_manager.clone();
            let metrics = metrics.clone();
            let bus = bus.clone();
            let milestone_payload_tx = milestone_payload.tx();
            let solidifier_tx = solidifier.tx();
            let fatal = fatal.clone();

            daemon.spawn("Processor", PRIORITY_PROCESSOR, move |mut shutdown| async move {
                info!("Processor worker running.");

                let mut rx = rx;

                while let Some(event) = shutdown.drive(&mut rx).await {
                    if let Err(e) = process(
                        &tangle,
                        &request_queue,
                        &peer_manager,
                        &metrics,
                        &bus,
                        &milestone_payload_tx,
                        &solidifier_tx,
                        event,
                    ) {
                        error!("Processing a message failed fatally: {}.", e);
                        fatal.notify_one();
                        break;
                    }
                }

                info!("Processor worker stopped.");
            });
        }

        Self { tx }
    }

    /// Submits one message for processing, waiting while the queue is full;
    /// this is the backpressure point of the intake path.
    pub async fn submit(&self, event: ProcessorWorkerEvent) {
        // Sending only fails when every worker is gone, during shutdown.
        let _ = self.tx.send(event).await;
    }

    /// Returns whether the intake queue is running hot; upstream peer readers
    /// throttle their reads while it is.
    pub fn is_busy(&self) -> bool {
        self.tx.len() > QUEUE_CAPACITY / 2
    }

    /// Returns the current intake backlog.
    pub fn backlog(&self) -> usize {
        self.tx.len()
    }
}

#[allow(clippy::too_many_arguments)]
fn process<B: StorageBackend>(
    tangle: &Tangle<B>,
    request_queue: &RequestQueue,
    peer_manager: &PeerManager,
    metrics: &ServerMetrics,
    bus: &Bus<'static>,
    milestone_payload_tx: &tokio::sync::mpsc::UnboundedSender<MilestonePayloadWorkerEvent>,
    solidifier_tx: &tokio::sync::mpsc::UnboundedSender<MilestoneSolidifierWorkerEvent>,
    event: ProcessorWorkerEvent,
) -> Result<(), Error> {
    let ProcessorWorkerEvent { bytes, from, requested } = event;

    let message = match Message::unpack(&mut bytes.as_slice()) {
        Ok(message) => message,
        Err(e) => {
            trace!("Dropping an undecodable message: {}.", e);
            metrics.invalid_messages_inc();
            if let Some(peer) = from.as_ref().and_then(|id| peer_manager.get(id)) {
                peer.metrics().invalid_messages_inc();
            }
            return Ok(());
        }
    };

    // The identifier is the hash of the raw bytes as they arrived.
    let message_id = MessageId::new(Blake2b256::digest(&bytes).into());

    // Wire messages carry no request context; it is recovered by matching
    // the id against the request queue.
    let requested = requested.or_else(|| {
        request_queue
            .get(&message_id)
            .map(|request| request.milestone_index)
    });

    if requested.is_some() {
        request_queue.mark_processing(&message_id);
    }

    let synced_threshold = tangle.is_synced_threshold();
    let (cached, newly) = tangle.insert(&message_id, message)?;

    if newly {
        metrics.new_messages_inc();
        if let Some(peer) = from.as_ref().and_then(|id| peer_manager.get(id)) {
            peer.metrics().new_messages_inc();
        }

        let metadata = tangle.metadata().get_or_create(&message_id, || {
            MessageMetadata::new(unix_now_secs(), requested.is_some(), !synced_threshold)
        })?;
        drop(metadata);

        let parents = cached.map(|message| message.parents());

        if let Some(parents) = parents {
            // Child edges are recorded whether or not the parents are known yet.
            for parent in &parents {
                tangle.children().add(parent, &message_id)?;
            }

            tangle.unconfirmed().add(tangle.latest_milestone_index(), &message_id)?;

            // Only messages that are part of a requested cone pull their
            // parents in; plain gossip does not grow the request queue.
            if let Some(milestone_index) = requested {
                for parent in &parents {
                    if !tangle.is_solid_entry_point(parent) && !tangle.contains(parent)? {
                        request_queue.enqueue(*parent, milestone_index);
                    }
                }
            }
        }

        let is_milestone = cached
            .map(|message| matches!(message.payload(), Payload::Milestone(_)))
            .unwrap_or(false);

        if is_milestone {
            let _ = milestone_payload_tx.send(MilestonePayloadWorkerEvent(message_id));
        }

        bus.dispatch(NewMessage {
            message_id,
            bytes,
            from,
        });
    } else {
        metrics.known_messages_inc();
        if let Some(peer) = from.as_ref().and_then(|id| peer_manager.get(id)) {
            peer.metrics().known_messages_inc();
        }

        bus.dispatch(KnownMessage { message_id });
    }

    // While syncing, forced releases keep whole cones from pinning the cache.
    cached.release(!synced_threshold);

    if requested.is_some() {
        request_queue.processed(&message_id);

        // An empty request queue on an unsynced node means every outstanding
        // cone piece has arrived; poke the solidifier.
        if !tangle.is_synced() && request_queue.is_empty() {
            let _ = solidifier_tx.send(MilestoneSolidifierWorkerEvent(MilestoneIndex(0)));
        }
    }

    Ok(())
}
