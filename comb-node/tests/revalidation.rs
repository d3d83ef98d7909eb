// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Rollback of an uncleanly closed database to its snapshot state.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use comb_message::{
    payload::{IndexationPayload, Payload},
    Message, MessageId,
};
use comb_node::{revalidation::revalidate, Error};
use comb_storage::{backend::StorageBackend, health};
use comb_storage_memory::{MemoryConfigBuilder, Storage};
use comb_tangle::{
    config::TangleConfig,
    storage::MilestoneEntry,
    MessageMetadata, MilestoneIndex, SnapshotInfo, Tangle,
};

fn tangle() -> Tangle<Storage> {
    let backend = Storage::start(MemoryConfigBuilder::new().finish()).unwrap();
    let tangle = Tangle::new(backend, &TangleConfig::default()).unwrap();

    tangle
        .replace_snapshot_info(SnapshotInfo::new(
            MilestoneIndex(100),
            MilestoneIndex(0),
            1_700_000_000,
            vec![(MessageId::new([0xaa; 32]), MilestoneIndex(100))],
        ))
        .unwrap();

    tangle
}

fn store_message(tangle: &Tangle<Storage>, nonce: u64) -> MessageId {
    let message = Message::new(
        MessageId::new([7u8; 32]),
        MessageId::new([8u8; 32]),
        Payload::Indexation(IndexationPayload::new([9u8; 16])),
        nonce,
    );
    let message_id = message.id();

    let (cached, newly) = tangle.insert(&message_id, message).unwrap();
    assert!(newly);
    drop(cached);

    message_id
}

fn store_metadata(tangle: &Tangle<Storage>, message_id: &MessageId, solid: bool, confirmed: Option<u32>) {
    let metadata = tangle
        .metadata()
        .get_or_create(message_id, || MessageMetadata::new(1000, false, false))
        .unwrap();

    metadata.mutate(|m| {
        if solid {
            m.mark_solid();
        }
        if let Some(index) = confirmed {
            m.confirm(MilestoneIndex(index));
        }
    });
}

#[test]
fn rolls_back_to_snapshot_state() {
    let tangle = tangle();

    // Milestones around the snapshot index; the ones above must go.
    for index in [99u32, 100, 101, 105, 120] {
        tangle
            .milestones()
            .store_if_absent(MilestoneEntry::new(MilestoneIndex(index), MessageId::new([index as u8; 32])))
            .unwrap();
    }

    // Messages in every state revalidation distinguishes.
    let keep_a = store_message(&tangle, 1);
    store_metadata(&tangle, &keep_a, true, Some(90));
    let keep_b = store_message(&tangle, 2);
    store_metadata(&tangle, &keep_b, true, Some(100));

    let drop_unsolid = store_message(&tangle, 3);
    store_metadata(&tangle, &drop_unsolid, false, None);

    let drop_unconfirmed = store_message(&tangle, 4);
    store_metadata(&tangle, &drop_unconfirmed, true, None);

    let drop_confirmed_above = store_message(&tangle, 5);
    store_metadata(&tangle, &drop_confirmed_above, true, Some(110));

    let drop_no_metadata = store_message(&tangle, 6);

    // A metadata record without a message.
    let orphan_metadata = MessageId::new([0x0f; 32]);
    store_metadata(&tangle, &orphan_metadata, true, Some(50));

    // Child edges; only the one between surviving messages may stay.
    tangle.children().add(&keep_a, &keep_b).unwrap();
    tangle.children().add(&keep_a, &drop_unsolid).unwrap();
    tangle.children().add(&MessageId::new([0xdd; 32]), &keep_b).unwrap();

    // Unconfirmed buckets are purged wholesale.
    tangle.unconfirmed().add(MilestoneIndex(101), &drop_unconfirmed).unwrap();
    tangle.unconfirmed().add(MilestoneIndex(50), &keep_a).unwrap();

    tangle.flush().unwrap();

    revalidate(&tangle, Arc::new(AtomicBool::new(false))).unwrap();

    // Milestones above the snapshot index are gone.
    for index in [99u32, 100] {
        assert!(tangle.milestones().contains(MilestoneIndex(index)).unwrap());
    }
    for index in [101u32, 105, 120] {
        assert!(!tangle.milestones().contains(MilestoneIndex(index)).unwrap());
    }

    // Only solid messages confirmed at or below the snapshot survive.
    assert!(tangle.contains(&keep_a).unwrap());
    assert!(tangle.contains(&keep_b).unwrap());
    for message_id in [drop_unsolid, drop_unconfirmed, drop_confirmed_above, drop_no_metadata] {
        assert!(!tangle.contains(&message_id).unwrap());
        assert!(tangle.metadata().get(&message_id).unwrap().is_none());
    }
    assert!(tangle.metadata().get(&orphan_metadata).unwrap().is_none());

    // Only the edge between surviving endpoints remains.
    let mut edges = Vec::new();
    tangle
        .children()
        .for_each(|edge| {
            edges.push((edge.parent, edge.child));
            true
        })
        .unwrap();
    assert_eq!(edges, vec![(keep_a, keep_b)]);

    // No unconfirmed records are left.
    let mut unconfirmed = 0;
    tangle
        .unconfirmed()
        .for_each(|_| {
            unconfirmed += 1;
            true
        })
        .unwrap();
    assert_eq!(unconfirmed, 0);

    // The database is tainted forever and anchored back at the snapshot.
    assert!(health::is_tainted(tangle.backend()).unwrap());
    assert_eq!(tangle.solid_milestone_index(), MilestoneIndex(100));
}

#[test]
fn missing_snapshot_info_aborts() {
    let backend = Storage::start(MemoryConfigBuilder::new().finish()).unwrap();
    let tangle = Tangle::new(backend, &TangleConfig::default()).unwrap();

    assert!(matches!(
        revalidate(&tangle, Arc::new(AtomicBool::new(false))),
        Err(Error::SnapshotInfoMissing)
    ));
}

#[test]
fn shutdown_signal_aborts_cleanly() {
    let tangle = tangle();

    for index in [101u32, 102] {
        tangle
            .milestones()
            .store_if_absent(MilestoneEntry::new(MilestoneIndex(index), MessageId::new([index as u8; 32])))
            .unwrap();
    }
    tangle.flush().unwrap();

    let shutdown = Arc::new(AtomicBool::new(true));
    shutdown.store(true, Ordering::Relaxed);

    assert!(matches!(
        revalidate(&tangle, shutdown),
        Err(Error::OperationAborted)
    ));

    // An aborted run still leaves the taint marker behind.
    assert!(health::is_tainted(tangle.backend()).unwrap());
}
