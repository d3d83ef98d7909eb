// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use comb_message::{payload::Payload, MessageId};
use comb_runtime::{daemon::Daemon, event::Bus};
use comb_storage::backend::StorageBackend;
use comb_tangle::{storage::MilestoneEntry, MilestoneIndex, Tangle};
use crypto::signatures::ed25519::{PublicKey, Signature};
use log::{error, info};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    event::{InvalidMilestone, LatestMilestoneChanged},
    metrics::ServerMetrics,
    workers::{MilestoneSolidifierWorker, MilestoneSolidifierWorkerEvent, PRIORITY_MILESTONE_PAYLOAD},
    Error,
};

/// A message carrying a milestone payload, to be validated.
pub struct MilestonePayloadWorkerEvent(pub MessageId);

/// The worker validating milestone payloads and feeding the solidifier.
pub struct MilestonePayloadWorker {
    tx: mpsc::UnboundedSender<MilestonePayloadWorkerEvent>,
}

impl MilestonePayloadWorker {
    /// Spawns the milestone payload worker on the daemon.
    pub fn spawn<B: StorageBackend>(
        daemon: &Daemon,
        tangle: Arc<Tangle<B>>,
        coordinator_public_key: [u8; 32],
        metrics: Arc<ServerMetrics>,
        bus: Arc<Bus<'static>>,
        solidifier: &MilestoneSolidifierWorker,
        fatal: Arc<Notify>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let solidifier_tx = solidifier.tx();

        daemon.spawn("MilestonePayload", PRIORITY_MILESTONE_PAYLOAD, move |mut shutdown| async move {
            info!("Milestone payload worker running.");

            let mut rx = UnboundedReceiverStream::new(rx);

            while let Some(MilestonePayloadWorkerEvent(message_id)) = shutdown.drive(&mut rx).await {
                if let Err(e) = validate(
                    &tangle,
                    &coordinator_public_key,
                    &metrics,
                    &bus,
                    &solidifier_tx,
                    message_id,
                ) {
                    error!("Validating a milestone failed fatally: {}.", e);
                    fatal.notify_one();
                    break;
                }
            }

            info!("Milestone payload worker stopped.");
        });

        Self { tx }
    }

    /// Returns a sender feeding this worker.
    pub fn tx(&self) -> mpsc::UnboundedSender<MilestonePayloadWorkerEvent> {
        self.tx.clone()
    }
}

fn validate<B: StorageBackend>(
    tangle: &Tangle<B>,
    coordinator_public_key: &[u8; 32],
    metrics: &ServerMetrics,
    bus: &Bus<'static>,
    solidifier_tx: &mpsc::UnboundedSender<MilestoneSolidifierWorkerEvent>,
    message_id: MessageId,
) -> Result<(), Error> {
    let Some(cached) = tangle.get(&message_id)? else {
        // The message was pruned between detection and validation.
        return Ok(());
    };

    let payload = cached.map(|message| match message.payload() {
        Payload::Milestone(milestone) => Some(milestone.clone()),
        _ => None,
    });
    drop(cached);

    let Some(Some(milestone)) = payload else {
        return Ok(());
    };

    let index = MilestoneIndex(milestone.index());

    if index <= tangle.snapshot_index() {
        info!("Dropping milestone {} below the snapshot index.", index);
        metrics.invalid_milestones_inc();
        bus.dispatch(InvalidMilestone { message_id });
        return Ok(());
    }

    if !verify_signature(coordinator_public_key, &milestone.essence(), milestone.signature()) {
        info!("Received milestone {} with an invalid signature.", index);
        metrics.invalid_milestones_inc();
        bus.dispatch(InvalidMilestone { message_id });
        return Ok(());
    }

    match tangle.milestones().store_if_absent(MilestoneEntry::new(index, message_id))? {
        Some(cached_milestone) => drop(cached_milestone),
        None => {
            // The slot is taken; the first milestone with this index wins.
            info!("Dropping duplicate milestone {}.", index);
            metrics.duplicate_milestones_inc();
            return Ok(());
        }
    }

    if index > tangle.latest_milestone_index() {
        tangle.update_latest_milestone_index(index);
        info!("New milestone {}.", index);
        bus.dispatch(LatestMilestoneChanged { index });
    }

    let _ = solidifier_tx.send(MilestoneSolidifierWorkerEvent(index));

    Ok(())
}

fn verify_signature(public_key: &[u8; 32], essence: &[u8], signature: &[u8; 64]) -> bool {
    match PublicKey::try_from_bytes(*public_key) {
        Ok(public_key) => public_key.verify(&Signature::from_bytes(*signature), essence),
        Err(_) => false,
    }
}
