// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{
    payload::{IndexationPayload, Payload},
    Message, MessageId,
};
use comb_storage::backend::StorageBackend;
use comb_storage_memory::{MemoryConfigBuilder, Storage};
use comb_tangle::{
    config::TangleConfig,
    storage::MilestoneEntry,
    MessageMetadata, MilestoneIndex, SnapshotInfo, Tangle,
};

fn tangle() -> Tangle<Storage> {
    let backend = Storage::start(MemoryConfigBuilder::new().finish()).unwrap();
    Tangle::new(backend, &TangleConfig::default()).unwrap()
}

fn message(tag: u8) -> Message {
    Message::new(
        MessageId::new([tag; 32]),
        MessageId::new([tag.wrapping_add(1); 32]),
        Payload::Indexation(IndexationPayload::new([tag; 16])),
        tag as u64,
    )
}

#[test]
fn get_none() {
    let tangle = tangle();

    assert!(tangle.get(&MessageId::new([1u8; 32])).unwrap().is_none());
}

#[test]
fn insert_get() {
    let tangle = tangle();
    let msg = message(3);
    let message_id = msg.id();

    let (cached, newly) = tangle.insert(&message_id, msg.clone()).unwrap();
    assert!(newly);
    assert_eq!(cached.map(|m| m.clone()), Some(msg));

    assert!(tangle.contains(&message_id).unwrap());

    let (_, newly) = tangle.insert(&message_id, message(3)).unwrap();
    assert!(!newly);
}

#[test]
fn metadata_solid_and_confirmed() {
    let tangle = tangle();
    let message_id = MessageId::new([7u8; 32]);

    let metadata = tangle
        .metadata()
        .get_or_create(&message_id, || MessageMetadata::new(1000, false, false))
        .unwrap();

    assert_eq!(metadata.map(|m| m.is_solid()), Some(false));
    drop(metadata);

    tangle.metadata().mark_solid(&message_id).unwrap();
    tangle.metadata().set_confirmed(&message_id, MilestoneIndex(5)).unwrap();

    let metadata = tangle.metadata().get(&message_id).unwrap().unwrap();
    assert_eq!(metadata.map(|m| m.is_solid()), Some(true));
    assert_eq!(metadata.map(|m| m.confirmed()), Some(Some(MilestoneIndex(5))));
}

#[test]
fn milestone_slot_is_immutable() {
    let tangle = tangle();

    let first = MilestoneEntry::new(MilestoneIndex(7), MessageId::new([1u8; 32]));
    let second = MilestoneEntry::new(MilestoneIndex(7), MessageId::new([2u8; 32]));

    assert!(tangle.milestones().store_if_absent(first).unwrap().is_some());
    // The slot is taken; the second store is rejected.
    assert!(tangle.milestones().store_if_absent(second).unwrap().is_none());

    let cached = tangle.milestones().get(MilestoneIndex(7)).unwrap().unwrap();
    assert_eq!(cached.map(|m| *m.message_id()), Some(MessageId::new([1u8; 32])));
}

#[test]
fn milestone_index_scans() {
    let tangle = tangle();

    for index in [3u32, 5, 9] {
        tangle
            .milestones()
            .store_if_absent(MilestoneEntry::new(MilestoneIndex(index), MessageId::new([index as u8; 32])))
            .unwrap();
    }
    tangle.milestones().flush().unwrap();

    assert_eq!(tangle.milestones().latest_index().unwrap(), Some(MilestoneIndex(9)));
    assert_eq!(
        tangle.milestones().next_index_after(MilestoneIndex(3)).unwrap(),
        Some(MilestoneIndex(5))
    );
    assert_eq!(tangle.milestones().next_index_after(MilestoneIndex(9)).unwrap(), None);
}

#[test]
fn children_per_parent() {
    let tangle = tangle();
    let parent = MessageId::new([1u8; 32]);

    tangle.children().add(&parent, &MessageId::new([2u8; 32])).unwrap();
    tangle.children().add(&parent, &MessageId::new([3u8; 32])).unwrap();
    tangle.children().add(&MessageId::new([9u8; 32]), &MessageId::new([4u8; 32])).unwrap();
    tangle.children().flush().unwrap();

    let mut children = Vec::new();
    tangle
        .children()
        .for_each_child_of(&parent, |child| {
            children.push(*child);
            true
        })
        .unwrap();

    assert_eq!(children, vec![MessageId::new([2u8; 32]), MessageId::new([3u8; 32])]);
}

#[test]
fn unconfirmed_buckets() {
    let tangle = tangle();

    tangle.unconfirmed().add(MilestoneIndex(4), &MessageId::new([1u8; 32])).unwrap();
    tangle.unconfirmed().add(MilestoneIndex(4), &MessageId::new([2u8; 32])).unwrap();
    tangle.unconfirmed().add(MilestoneIndex(5), &MessageId::new([3u8; 32])).unwrap();
    tangle.unconfirmed().flush().unwrap();

    let mut count = 0;
    tangle
        .unconfirmed()
        .for_each_at_index(MilestoneIndex(4), |_| {
            count += 1;
            true
        })
        .unwrap();
    assert_eq!(count, 2);

    tangle.unconfirmed().delete_at_index(MilestoneIndex(4)).unwrap();
    tangle.unconfirmed().flush().unwrap();

    let mut left = Vec::new();
    tangle
        .unconfirmed()
        .for_each(|unconfirmed| {
            left.push(unconfirmed.index);
            true
        })
        .unwrap();
    assert_eq!(left, vec![MilestoneIndex(5)]);
}

#[test]
fn snapshot_info_round_trip() {
    let tangle = tangle();

    assert!(tangle.snapshot_info().unwrap().is_none());

    let entry_point = MessageId::new([8u8; 32]);
    let info = SnapshotInfo::new(
        MilestoneIndex(100),
        MilestoneIndex(50),
        1_700_000_000,
        vec![(entry_point, MilestoneIndex(100))],
    );

    tangle.replace_snapshot_info(info.clone()).unwrap();

    assert_eq!(tangle.snapshot_info().unwrap(), Some(info));
    assert_eq!(tangle.snapshot_index(), MilestoneIndex(100));
    assert_eq!(tangle.pruning_index(), MilestoneIndex(50));
    assert_eq!(tangle.solid_milestone_index(), MilestoneIndex(100));
    assert!(tangle.is_solid_entry_point(&entry_point));
    assert!(tangle.is_solid_entry_point(&MessageId::null()));
    assert!(!tangle.is_solid_entry_point(&MessageId::new([9u8; 32])));
}

#[test]
fn sync_predicates() {
    let tangle = tangle();

    // No milestone known yet.
    assert!(!tangle.is_synced());

    tangle.update_latest_milestone_index(MilestoneIndex(10));
    tangle.update_solid_milestone_index(MilestoneIndex(8));

    assert!(!tangle.is_synced());
    assert!(tangle.is_synced_threshold());

    tangle.update_solid_milestone_index(MilestoneIndex(10));
    assert!(tangle.is_synced());

    // Indexes never move backwards.
    tangle.update_solid_milestone_index(MilestoneIndex(5));
    assert_eq!(tangle.solid_milestone_index(), MilestoneIndex(10));
}
