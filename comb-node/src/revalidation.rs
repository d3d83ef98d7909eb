// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The offline database recovery procedure.
//!
//! The node keeps almost all tangle data behind write-back caches; after a
//! crash it is not guaranteed that everything in the caches reached the disk.
//! Revalidation restores a consistent state by rolling the stores back to the
//! last local snapshot: everything newer is deleted and re-acquired through
//! normal solidification afterwards.
//!
//! Any partial run leaves the database corrupted, so an aborted revalidation
//! resumes from scratch on the next start.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use comb_message::MessageId;
use comb_storage::{backend::StorageBackend, health};
use comb_tangle::{MilestoneIndex, Tangle};
use log::info;

use crate::Error;

// Interval for printing progress while scanning large stores.
const PRINT_STATUS_INTERVAL: Duration = Duration::from_secs(2);

struct StatusPrinter {
    last: Instant,
    shutdown: Arc<AtomicBool>,
}

impl StatusPrinter {
    fn new(shutdown: Arc<AtomicBool>) -> Self {
        Self {
            last: Instant::now(),
            shutdown,
        }
    }

    // Returns `false` when the shutdown signal was observed.
    fn tick(&mut self, status: impl Fn() -> String) -> bool {
        if self.last.elapsed() >= PRINT_STATUS_INTERVAL {
            self.last = Instant::now();

            if self.shutdown.load(Ordering::Relaxed) {
                return false;
            }

            info!("{}", status());
        }

        true
    }

    fn aborted(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Rolls the tangle stores back to the state of the last local snapshot.
pub fn revalidate<B: StorageBackend>(tangle: &Tangle<B>, shutdown: Arc<AtomicBool>) -> Result<(), Error> {
    // Mark the database as tainted forever so nothing signing milestones ever
    // runs against a revalidated state.
    health::mark_tainted(tangle.backend())?;

    let start = Instant::now();

    let snapshot_info = tangle.snapshot_info()?.ok_or(Error::SnapshotInfoMissing)?;
    let snapshot_index = snapshot_info.snapshot_index();

    let latest_milestone_index = tangle.milestones().latest_index()?.unwrap_or(MilestoneIndex(0));

    if snapshot_index > latest_milestone_index && *latest_milestone_index != 0 {
        return Err(Error::MilestoneOlderThanSnapshot);
    }

    info!(
        "Reverting the database state from milestone {} back to the local snapshot {} (this may take a while)...",
        latest_milestone_index, snapshot_index
    );

    cleanup_milestones(tangle, snapshot_index, &shutdown)?;

    // Ledger diffs above the snapshot would be dropped here; the ledger state
    // is out of scope of this store, the phase is reserved.

    cleanup_messages(tangle, snapshot_index, &shutdown)?;
    cleanup_metadata(tangle, &shutdown)?;
    cleanup_children(tangle, &shutdown)?;
    cleanup_unconfirmed(tangle, &shutdown)?;

    info!("Flushing the stores...");
    tangle.flush()?;

    tangle.update_solid_milestone_index(snapshot_index);

    info!(
        "Reverted the state back to the local snapshot {}, took {:?}.",
        snapshot_index,
        start.elapsed()
    );

    Ok(())
}

/// Deletes milestones above the snapshot index, and their unconfirmed buckets.
fn cleanup_milestones<B: StorageBackend>(
    tangle: &Tangle<B>,
    snapshot_index: MilestoneIndex,
    shutdown: &Arc<AtomicBool>,
) -> Result<(), Error> {
    let mut printer = StatusPrinter::new(shutdown.clone());
    let mut analyzed: u64 = 0;
    let mut to_delete = Vec::new();

    tangle.milestones().for_each_index(|index| {
        analyzed += 1;

        if index > snapshot_index {
            to_delete.push(index);
        }

        printer.tick(|| format!("Analyzed {} milestones.", analyzed))
    })?;

    if printer.aborted() {
        return Err(Error::OperationAborted);
    }

    let total = to_delete.len();
    for (deleted, index) in to_delete.into_iter().enumerate() {
        if !printer.tick(|| format!("Deleting milestones... {}/{}.", deleted, total)) {
            return Err(Error::OperationAborted);
        }

        tangle.unconfirmed().delete_at_index(index)?;
        tangle.milestones().delete(index)?;
    }

    info!("Deleted {} milestones above the snapshot index.", total);

    Ok(())
}

/// Deletes messages that are unsolid, unconfirmed, confirmed above the
/// snapshot index, or missing their metadata.
fn cleanup_messages<B: StorageBackend>(
    tangle: &Tangle<B>,
    snapshot_index: MilestoneIndex,
    shutdown: &Arc<AtomicBool>,
) -> Result<(), Error> {
    let mut printer = StatusPrinter::new(shutdown.clone());
    let mut analyzed: u64 = 0;
    let mut to_delete = Vec::new();

    tangle.messages().for_each_id(|message_id| {
        analyzed += 1;

        // Looking at the stored record is enough here; nothing else runs.
        let delete = match tangle.metadata().get(message_id) {
            Ok(Some(metadata)) => metadata
                .map(|m| !m.is_solid() || !matches!(m.confirmed(), Some(confirmed) if confirmed <= snapshot_index))
                .unwrap_or(true),
            _ => true,
        };

        if delete {
            to_delete.push(*message_id);
        }

        printer.tick(|| format!("Analyzed {} messages.", analyzed))
    })?;
    info!("Analyzed {} messages.", analyzed);

    if printer.aborted() {
        return Err(Error::OperationAborted);
    }

    let total = to_delete.len();
    for (deleted, message_id) in to_delete.into_iter().enumerate() {
        if !printer.tick(|| format!("Deleting messages... {}/{}.", deleted, total)) {
            return Err(Error::OperationAborted);
        }

        tangle.messages().delete(&message_id)?;
    }

    info!("Deleted {} messages.", total);

    Ok(())
}

/// Deletes metadata records whose message is gone.
fn cleanup_metadata<B: StorageBackend>(tangle: &Tangle<B>, shutdown: &Arc<AtomicBool>) -> Result<(), Error> {
    let mut printer = StatusPrinter::new(shutdown.clone());
    let mut analyzed: u64 = 0;
    let mut to_delete = Vec::new();

    tangle.metadata().for_each_id(|message_id| {
        analyzed += 1;

        if !tangle.contains(message_id).unwrap_or(false) {
            to_delete.push(*message_id);
        }

        printer.tick(|| format!("Analyzed {} metadata records.", analyzed))
    })?;

    if printer.aborted() {
        return Err(Error::OperationAborted);
    }

    let total = to_delete.len();
    for (deleted, message_id) in to_delete.into_iter().enumerate() {
        if !printer.tick(|| format!("Deleting metadata... {}/{}.", deleted, total)) {
            return Err(Error::OperationAborted);
        }

        tangle.metadata().delete(&message_id)?;
    }

    info!("Deleted {} metadata records.", total);

    Ok(())
}

/// Deletes child edges where either endpoint is gone.
fn cleanup_children<B: StorageBackend>(tangle: &Tangle<B>, shutdown: &Arc<AtomicBool>) -> Result<(), Error> {
    let mut printer = StatusPrinter::new(shutdown.clone());
    let mut analyzed: u64 = 0;
    let mut to_delete: Vec<(MessageId, MessageId)> = Vec::new();

    tangle.children().for_each(|edge| {
        analyzed += 1;

        let parent_present = tangle.contains(&edge.parent).unwrap_or(false);
        let child_present = tangle.contains(&edge.child).unwrap_or(false);

        if !parent_present || !child_present {
            to_delete.push((edge.parent, edge.child));
        }

        printer.tick(|| format!("Analyzed {} child edges.", analyzed))
    })?;

    if printer.aborted() {
        return Err(Error::OperationAborted);
    }

    let total = to_delete.len();
    for (deleted, (parent, child)) in to_delete.into_iter().enumerate() {
        if !printer.tick(|| format!("Deleting child edges... {}/{}.", deleted, total)) {
            return Err(Error::OperationAborted);
        }

        tangle.children().delete(&parent, &child)?;
    }

    info!("Deleted {} child edges.", total);

    Ok(())
}

/// Deletes every remaining unconfirmed-message record; everything above the
/// snapshot is gone and everything below does not need them.
fn cleanup_unconfirmed<B: StorageBackend>(tangle: &Tangle<B>, shutdown: &Arc<AtomicBool>) -> Result<(), Error> {
    let mut printer = StatusPrinter::new(shutdown.clone());
    let mut analyzed: u64 = 0;
    let mut to_delete = Vec::new();

    tangle.unconfirmed().for_each(|unconfirmed| {
        analyzed += 1;
        to_delete.push((unconfirmed.index, unconfirmed.message_id));

        printer.tick(|| format!("Analyzed {} unconfirmed records.", analyzed))
    })?;

    if printer.aborted() {
        return Err(Error::OperationAborted);
    }

    let total = to_delete.len();
    for (deleted, (index, message_id)) in to_delete.into_iter().enumerate() {
        if !printer.tick(|| format!("Deleting unconfirmed records... {}/{}.", deleted, total)) {
            return Err(Error::OperationAborted);
        }

        tangle.unconfirmed().delete(index, &message_id)?;
    }

    info!("Deleted {} unconfirmed records.", total);

    Ok(())
}
