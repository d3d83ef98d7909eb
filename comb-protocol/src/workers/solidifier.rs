// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashSet, sync::Arc};

use comb_message::MessageId;
use comb_runtime::{daemon::Daemon, event::Bus};
use comb_storage::backend::StorageBackend;
use comb_tangle::{MilestoneIndex, Tangle};
use log::{error, info};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    event::{MessageSolidified, SolidMilestoneAdvanced},
    request::RequestQueue,
    workers::PRIORITY_SOLIDIFIER,
    Error,
};

/// A solidification trigger; index zero means "whichever milestone is next".
pub struct MilestoneSolidifierWorkerEvent(pub MilestoneIndex);

/// The worker walking milestone past cones, requesting the missing pieces and
/// advancing the solid milestone index.
pub struct MilestoneSolidifierWorker {
    tx: mpsc::UnboundedSender<MilestoneSolidifierWorkerEvent>,
}

impl MilestoneSolidifierWorker {
    /// Spawns the milestone solidifier worker on the daemon.
    pub fn spawn<B: StorageBackend>(
        daemon: &Daemon,
        tangle: Arc<Tangle<B>>,
        request_queue: Arc<RequestQueue>,
        bus: Arc<Bus<'static>>,
        fatal: Arc<Notify>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        daemon.spawn("MilestoneSolidifier", PRIORITY_SOLIDIFIER, move |mut shutdown| async move {
            info!("Milestone solidifier worker running.");

            let mut rx = UnboundedReceiverStream::new(rx);

            while let Some(MilestoneSolidifierWorkerEvent(index)) = shutdown.drive(&mut rx).await {
                if let Err(e) = solidify(&tangle, &request_queue, &bus, index) {
                    error!("Solidification failed fatally: {}.", e);
                    fatal.notify_one();
                    break;
                }
            }

            info!("Milestone solidifier worker stopped.");
        });

        Self { tx }
    }

    /// Returns a sender feeding this worker.
    pub fn tx(&self) -> mpsc::UnboundedSender<MilestoneSolidifierWorkerEvent> {
        self.tx.clone()
    }
}

/// Runs solidification towards `requested`, then keeps advancing the solid
/// milestone index while consecutive milestones turn out solid.
fn solidify<B: StorageBackend>(
    tangle: &Tangle<B>,
    request_queue: &RequestQueue,
    bus: &Bus<'static>,
    requested: MilestoneIndex,
) -> Result<(), Error> {
    let mut target = requested;

    loop {
        let solid_index = tangle.solid_milestone_index();

        if *target == 0 || target <= solid_index {
            match tangle.milestones().next_index_after(solid_index)? {
                Some(next) => target = next,
                None => return Ok(()),
            }
        }

        if !solidify_cone(tangle, request_queue, bus, target)? {
            return Ok(());
        }

        if target != solid_index + 1 {
            // The cone is solid but an earlier milestone is still missing;
            // the next completed request retries.
            return Ok(());
        }

        confirm_cone(tangle, target)?;

        tangle.update_solid_milestone_index(target);
        info!("New solid milestone {}.", target);
        bus.dispatch(SolidMilestoneAdvanced { index: target });

        // Try to ride the wave: the next milestone may already be solid.
        target = MilestoneIndex(0);
    }
}

/// Walks the past cone of milestone `target` with an explicit stack, marking
/// every resolvable message solid and requesting the missing ones at the
/// milestone's priority. Returns whether the whole cone is solid.
fn solidify_cone<B: StorageBackend>(
    tangle: &Tangle<B>,
    request_queue: &RequestQueue,
    bus: &Bus<'static>,
    target: MilestoneIndex,
) -> Result<bool, Error> {
    let Some(cached_milestone) = tangle.milestones().get(target)? else {
        return Ok(false);
    };
    let Some(root) = cached_milestone.map(|entry| *entry.message_id()) else {
        return Ok(false);
    };
    drop(cached_milestone);

    let mut solid: HashSet<MessageId> = HashSet::new();
    let mut expanded: HashSet<MessageId> = HashSet::new();
    let mut missing = false;

    // (id, revisit): a message is expanded once, then revisited after its
    // parents have settled. Recursion would not survive deep histories.
    let mut stack: Vec<(MessageId, bool)> = vec![(root, false)];

    while let Some((message_id, revisit)) = stack.pop() {
        if revisit {
            let Some(cached) = tangle.get(&message_id)? else {
                missing = true;
                continue;
            };
            let Some(parents) = cached.map(|message| message.parents()) else {
                missing = true;
                continue;
            };
            drop(cached);

            let all_solid = parents
                .iter()
                .all(|parent| solid.contains(parent) || tangle.is_solid_entry_point(parent));

            if all_solid {
                if let Some(metadata) = tangle.metadata().get(&message_id)? {
                    let was_solid = metadata.map(|m| m.is_solid()).unwrap_or(true);
                    if !was_solid {
                        metadata.mutate(|m| m.mark_solid());
                        bus.dispatch(MessageSolidified { message_id });
                    }
                }
                solid.insert(message_id);
            }

            continue;
        }

        if solid.contains(&message_id) || !expanded.insert(message_id) {
            continue;
        }

        if tangle.is_solid_entry_point(&message_id) {
            solid.insert(message_id);
            continue;
        }

        if let Some(metadata) = tangle.metadata().get(&message_id)? {
            if metadata.map(|m| m.is_solid()).unwrap_or(false) {
                solid.insert(message_id);
                continue;
            }
        }

        match tangle.get(&message_id)? {
            None => {
                request_queue.enqueue(message_id, target);
                missing = true;
            }
            Some(cached) => {
                let Some(mut parents) = cached.map(|message| message.parents()) else {
                    missing = true;
                    continue;
                };
                drop(cached);

                // Deterministic walk order between siblings.
                parents.sort();

                stack.push((message_id, true));
                for parent in parents {
                    stack.push((parent, false));
                }
            }
        }
    }

    Ok(!missing && solid.contains(&root))
}

/// Assigns `confirmed_by = target` across the past cone of milestone
/// `target`, skipping entry points and already confirmed messages.
fn confirm_cone<B: StorageBackend>(tangle: &Tangle<B>, target: MilestoneIndex) -> Result<(), Error> {
    let Some(cached_milestone) = tangle.milestones().get(target)? else {
        return Ok(());
    };
    let Some(root) = cached_milestone.map(|entry| *entry.message_id()) else {
        return Ok(());
    };
    drop(cached_milestone);

    let mut visited: HashSet<MessageId> = HashSet::new();
    let mut stack: Vec<MessageId> = vec![root];

    while let Some(message_id) = stack.pop() {
        if !visited.insert(message_id) || tangle.is_solid_entry_point(&message_id) {
            continue;
        }

        let Some(metadata) = tangle.metadata().get(&message_id)? else {
            continue;
        };

        let already_confirmed = metadata.map(|m| m.confirmed().is_some()).unwrap_or(true);
        if already_confirmed {
            continue;
        }

        metadata.mutate(|m| m.confirm(target));
        drop(metadata);

        if let Some(cached) = tangle.get(&message_id)? {
            if let Some(mut parents) = cached.map(|message| message.parents()) {
                // Confirmation order between siblings is by id.
                parents.sort();
                for parent in parents {
                    stack.push(parent);
                }
            }
        }
    }

    Ok(())
}
