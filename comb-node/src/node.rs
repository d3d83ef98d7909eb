// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The node runner: storage bring-up, revalidation, worker wiring and the
//! shutdown sequence.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use comb_message::MessageId;
use comb_protocol::{
    config::ProtocolConfig,
    event::NewMessage,
    metrics::ServerMetrics,
    packet::{MessagePacket, Packet},
    peer::PeerManager,
    request::RequestQueue,
    workers::{
        MilestonePayloadWorker, MilestoneSolidifierWorker, ProcessorWorker, RequesterWorker, StatusWorker,
    },
};
use comb_runtime::{daemon::Daemon, event::Bus};
use comb_storage::{
    backend::StorageBackend,
    health::{fetch_health, set_health, StorageHealth},
};
use comb_storage_sled::Storage;
use comb_tangle::{MilestoneIndex, SnapshotInfo, Tangle};
use log::{info, warn};
use tokio::sync::Notify;

use crate::{
    config::NodeConfig,
    identity::load_or_create_identity,
    peering::{spawn_peering, PeeringContext},
    revalidation::revalidate,
    Error,
};

/// Runs the node until a shutdown signal or a fatal error; the caller decides
/// the process exit code from the result.
pub async fn run(config: NodeConfig, force_revalidation: bool) -> Result<(), Error> {
    let identity = load_or_create_identity(Path::new(&config.network.peer_store_path), config.network.identity_private_key.as_deref())?;
    info!("Node public key: {}.", hex::encode(identity.public_key().to_bytes()));

    let backend = Storage::start(config.storage.clone())?;

    let unclean = matches!(fetch_health(&backend)?, Some(StorageHealth::Corrupted));
    let tangle = Arc::new(Tangle::new(backend.clone(), &config.caches)?);

    if tangle.snapshot_info()?.is_none() {
        // A fresh database is anchored at the configured snapshot, or at the
        // genesis when nothing is configured.
        info!(
            "No snapshot information found; anchoring at snapshot {}.",
            config.snapshot.index
        );

        let mut entry_points: Vec<(MessageId, MilestoneIndex)> = config
            .snapshot
            .entry_points
            .iter()
            .map(|message_id| (*message_id, config.snapshot.index))
            .collect();
        if entry_points.is_empty() {
            entry_points.push((MessageId::null(), config.snapshot.index));
        }

        tangle.replace_snapshot_info(SnapshotInfo::new(
            config.snapshot.index,
            MilestoneIndex(0),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|duration| duration.as_secs())
                .unwrap_or(0),
            entry_points,
        ))?;
    }

    if unclean || force_revalidation {
        if unclean {
            warn!("The database was not closed cleanly; revalidating it.");
        } else {
            info!("Revalidation forced by the command line.");
        }

        let revalidation_shutdown = Arc::new(AtomicBool::new(false));
        {
            let revalidation_shutdown = revalidation_shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    revalidation_shutdown.store(true, Ordering::Relaxed);
                }
            });
        }

        let revalidation_tangle = tangle.clone();
        tokio::task::spawn_blocking(move || revalidate(&revalidation_tangle, revalidation_shutdown))
            .await
            .map_err(|_| Error::OperationAborted)??;
    }

    // Armed until the shutdown below completes; a crash from here on triggers
    // revalidation on the next start.
    set_health(&backend, StorageHealth::Corrupted)?;

    let daemon = Daemon::new();
    let bus = Arc::new(Bus::default());
    let metrics = Arc::new(ServerMetrics::new());
    let request_queue = Arc::new(RequestQueue::new());
    let peer_manager = Arc::new(PeerManager::new());
    let fatal = Arc::new(Notify::new());

    let solidifier = MilestoneSolidifierWorker::spawn(
        &daemon,
        tangle.clone(),
        request_queue.clone(),
        bus.clone(),
        fatal.clone(),
    );
    let milestone_payload = MilestonePayloadWorker::spawn(
        &daemon,
        tangle.clone(),
        config.protocol.coordinator_public_key,
        metrics.clone(),
        bus.clone(),
        &solidifier,
        fatal.clone(),
    );
    let processor = Arc::new(ProcessorWorker::spawn(
        &daemon,
        tangle.clone(),
        request_queue.clone(),
        peer_manager.clone(),
        metrics.clone(),
        bus.clone(),
        &milestone_payload,
        &solidifier,
        fatal.clone(),
    ));
    RequesterWorker::spawn(
        &daemon,
        request_queue.clone(),
        peer_manager.clone(),
        metrics.clone(),
        request_timeout(&config.protocol),
    );
    {
        let backlog_processor = processor.clone();
        StatusWorker::spawn(&daemon, tangle.clone(), request_queue.clone(), move || {
            backlog_processor.backlog()
        });
    }

    // Freshly stored messages are forwarded to everyone but their origin.
    {
        let peer_manager = peer_manager.clone();
        let metrics = metrics.clone();
        bus.add_listener::<NewMessage, _>(move |event| {
            let frame = MessagePacket::new(event.bytes.clone()).to_frame();
            let sent = peer_manager.broadcast(&frame, event.from.as_ref());
            for _ in 0..sent {
                metrics.messages_sent_inc();
            }
        });
    }

    let peering_context = PeeringContext::new(
        &config,
        tangle.clone(),
        peer_manager.clone(),
        processor.clone(),
        metrics.clone(),
    );
    spawn_peering(&daemon, peering_context, &config.network, &config.peering);

    info!("Node running.");

    let fatal_error = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
            false
        }
        _ = fatal.notified() => {
            warn!("Shutting down after a fatal storage error.");
            true
        }
    };

    daemon.shutdown().await;

    info!("Flushing the tangle...");
    tangle.shutdown()?;

    if !fatal_error {
        set_health(&backend, StorageHealth::Healthy)?;
    }

    backend.shutdown()?;
    info!("Shutdown complete.");

    if fatal_error {
        return Err(Error::Storage(comb_storage::Error::Backend(
            "the storage failed while the node was running".into(),
        )));
    }

    Ok(())
}

fn request_timeout(protocol: &ProtocolConfig) -> std::time::Duration {
    std::time::Duration::from_secs(protocol.request_timeout_secs)
}
