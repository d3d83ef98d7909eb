// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests of the intake → milestone → solidification pipeline over
//! an in-memory backend.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use comb_message::{
    packable::Packable,
    payload::{IndexationPayload, MilestonePayload, Payload},
    Message, MessageId,
};
use comb_protocol::{
    event::{InvalidMilestone, KnownMessage, NewMessage, SolidMilestoneAdvanced},
    metrics::ServerMetrics,
    peer::PeerManager,
    request::RequestQueue,
    workers::{
        MilestonePayloadWorker, MilestoneSolidifierWorker, ProcessorWorker, ProcessorWorkerEvent,
    },
};
use comb_runtime::{daemon::Daemon, event::Bus};
use comb_storage_memory::{MemoryConfigBuilder, Storage};
use comb_tangle::{config::TangleConfig, MilestoneIndex, SnapshotInfo, Tangle};
use comb_storage::backend::StorageBackend;
use crypto::signatures::ed25519::SecretKey;
use tokio::sync::Notify;

struct TestNode {
    daemon: Daemon,
    tangle: Arc<Tangle<Storage>>,
    request_queue: Arc<RequestQueue>,
    metrics: Arc<ServerMetrics>,
    bus: Arc<Bus<'static>>,
    processor: ProcessorWorker,
}

fn coordinator() -> SecretKey {
    SecretKey::from_bytes([42u8; 32])
}

fn setup() -> TestNode {
    let backend = Storage::start(MemoryConfigBuilder::new().finish()).unwrap();
    let tangle = Arc::new(Tangle::new(backend, &TangleConfig::default()).unwrap());
    let request_queue = Arc::new(RequestQueue::new());
    let peer_manager = Arc::new(PeerManager::new());
    let metrics = Arc::new(ServerMetrics::new());
    let bus = Arc::new(Bus::default());
    let fatal = Arc::new(Notify::new());
    let daemon = Daemon::new();

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
        coordinator().public_key().to_bytes(),
        metrics.clone(),
        bus.clone(),
        &solidifier,
        fatal.clone(),
    );
    let processor = ProcessorWorker::spawn(
        &daemon,
        tangle.clone(),
        request_queue.clone(),
        peer_manager,
        metrics.clone(),
        bus.clone(),
        &milestone_payload,
        &solidifier,
        fatal,
    );

    TestNode {
        daemon,
        tangle,
        request_queue,
        metrics,
        bus,
        processor,
    }
}

fn message(parent: MessageId, nonce: u64) -> (Vec<u8>, MessageId) {
    let message = Message::new(
        parent,
        parent,
        Payload::Indexation(IndexationPayload::new([1u8; 16])),
        nonce,
    );
    let bytes = message.pack_new().unwrap();

    (bytes, message.id())
}

fn milestone_message(parent: MessageId, index: u32, nonce: u64) -> (Vec<u8>, MessageId) {
    let unsigned = MilestonePayload::new(index, 1_700_000_000, [3u8; 64], [0u8; 64]);
    let signature = coordinator().sign(&unsigned.essence()).to_bytes();
    let message = Message::new(
        parent,
        parent,
        Payload::Milestone(Box::new(MilestonePayload::new(
            index,
            1_700_000_000,
            [3u8; 64],
            signature,
        ))),
        nonce,
    );
    let bytes = message.pack_new().unwrap();

    (bytes, message.id())
}

async fn wait_until(what: &str, f: impl Fn() -> bool) {
    for _ in 0..1000 {
        if f() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("timed out waiting for {}", what);
}

async fn submit(node: &TestNode, bytes: Vec<u8>, requested: Option<MilestoneIndex>) {
    node.processor
        .submit(ProcessorWorkerEvent {
            bytes,
            from: None,
            requested,
        })
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn known_message_counts_once() {
    let node = setup();

    let new_events = Arc::new(AtomicUsize::new(0));
    let known_events = Arc::new(AtomicUsize::new(0));
    {
        let new_events = new_events.clone();
        node.bus.add_listener::<NewMessage, _>(move |_| {
            new_events.fetch_add(1, Ordering::SeqCst);
        });
        let known_events = known_events.clone();
        node.bus.add_listener::<KnownMessage, _>(move |_| {
            known_events.fetch_add(1, Ordering::SeqCst);
        });
    }

    let (bytes, message_id) = message(MessageId::null(), 7);

    submit(&node, bytes.clone(), None).await;
    wait_until("first intake", || new_events.load(Ordering::SeqCst) == 1).await;
    assert!(node.tangle.contains(&message_id).unwrap());

    submit(&node, bytes, None).await;
    wait_until("second intake", || known_events.load(Ordering::SeqCst) == 1).await;

    assert_eq!(node.metrics.new_messages(), 1);
    assert_eq!(node.metrics.known_messages(), 1);
    assert_eq!(new_events.load(Ordering::SeqCst), 1);
    assert_eq!(known_events.load(Ordering::SeqCst), 1);

    node.daemon.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_message_is_dropped() {
    let node = setup();

    submit(&node, vec![0xff; 40], None).await;
    wait_until("drop", || node.metrics.invalid_messages() == 1).await;

    assert_eq!(node.metrics.new_messages(), 0);

    node.daemon.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn solidification_chain_advances_once() {
    let node = setup();

    // Anchor the history: snapshot at index 4 with one entry point.
    let entry_point = MessageId::new([0xee; 32]);
    node.tangle
        .replace_snapshot_info(SnapshotInfo::new(
            MilestoneIndex(4),
            MilestoneIndex(0),
            1_700_000_000,
            vec![(entry_point, MilestoneIndex(4))],
        ))
        .unwrap();
    assert_eq!(node.tangle.solid_milestone_index(), MilestoneIndex(4));

    let advanced = Arc::new(AtomicUsize::new(0));
    {
        let advanced = advanced.clone();
        node.bus.add_listener::<SolidMilestoneAdvanced, _>(move |event| {
            assert_eq!(event.index, MilestoneIndex(5));
            advanced.fetch_add(1, Ordering::SeqCst);
        });
    }

    // A chain: milestone 5 → m1 → m2 → entry point.
    let (m2_bytes, m2_id) = message(entry_point, 2);
    let (m1_bytes, m1_id) = message(m2_id, 1);
    let (ms_bytes, ms_id) = milestone_message(m1_id, 5, 0);

    // Only the milestone is known at first; its parents must be requested.
    submit(&node, ms_bytes, None).await;
    wait_until("m1 requested", || node.request_queue.contains(&m1_id)).await;
    assert_eq!(node.tangle.latest_milestone_index(), MilestoneIndex(5));
    assert_eq!(node.request_queue.peek().unwrap().milestone_index, MilestoneIndex(5));

    // The answers arrive; each one pulls the next parent in.
    submit(&node, m1_bytes, Some(MilestoneIndex(5))).await;
    wait_until("m2 requested", || node.request_queue.contains(&m2_id)).await;

    submit(&node, m2_bytes, Some(MilestoneIndex(5))).await;
    wait_until("solid milestone 5", || {
        node.tangle.solid_milestone_index() == MilestoneIndex(5)
    })
    .await;

    assert_eq!(advanced.load(Ordering::SeqCst), 1);
    assert!(node.request_queue.is_empty());

    // The whole cone is solid and confirmed by milestone 5.
    for message_id in [ms_id, m1_id, m2_id] {
        let metadata = node.tangle.metadata().get(&message_id).unwrap().unwrap();
        assert_eq!(metadata.map(|m| m.is_solid()), Some(true));
        assert_eq!(metadata.map(|m| m.confirmed()), Some(Some(MilestoneIndex(5))));
    }

    node.daemon.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_milestone_is_rejected() {
    let node = setup();

    let (first_bytes, first_id) = milestone_message(MessageId::new([1u8; 32]), 7, 100);
    let (second_bytes, second_id) = milestone_message(MessageId::new([2u8; 32]), 7, 200);
    assert_ne!(first_id, second_id);

    submit(&node, first_bytes, None).await;
    wait_until("first milestone stored", || {
        node.tangle.milestones().contains(MilestoneIndex(7)).unwrap()
    })
    .await;

    submit(&node, second_bytes, None).await;
    wait_until("duplicate rejected", || node.metrics.duplicate_milestones() == 1).await;

    // The slot keeps the first message.
    let cached = node.tangle.milestones().get(MilestoneIndex(7)).unwrap().unwrap();
    assert_eq!(cached.map(|entry| *entry.message_id()), Some(first_id));

    node.daemon.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn below_snapshot_milestone_is_invalid() {
    let node = setup();

    node.tangle
        .replace_snapshot_info(SnapshotInfo::new(
            MilestoneIndex(4),
            MilestoneIndex(0),
            1_700_000_000,
            vec![(MessageId::new([0xee; 32]), MilestoneIndex(4))],
        ))
        .unwrap();

    let invalid_events = Arc::new(AtomicUsize::new(0));
    {
        let invalid_events = invalid_events.clone();
        node.bus.add_listener::<InvalidMilestone, _>(move |_| {
            invalid_events.fetch_add(1, Ordering::SeqCst);
        });
    }

    // Properly signed, but its index is already covered by the snapshot.
    let (bytes, _) = milestone_message(MessageId::new([1u8; 32]), 3, 0);

    submit(&node, bytes, None).await;
    wait_until("invalid milestone", || invalid_events.load(Ordering::SeqCst) == 1).await;

    assert_eq!(node.metrics.invalid_milestones(), 1);
    assert!(!node.tangle.milestones().contains(MilestoneIndex(3)).unwrap());
    assert_eq!(node.tangle.latest_milestone_index(), MilestoneIndex(4));

    node.daemon.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_milestone_signature_is_dropped() {
    let node = setup();

    // A milestone signed with the wrong key.
    let unsigned = MilestonePayload::new(9, 1_700_000_000, [3u8; 64], [0u8; 64]);
    let wrong_signature = SecretKey::from_bytes([7u8; 32]).sign(&unsigned.essence()).to_bytes();
    let message = Message::new(
        MessageId::new([1u8; 32]),
        MessageId::new([1u8; 32]),
        Payload::Milestone(Box::new(MilestonePayload::new(
            9,
            1_700_000_000,
            [3u8; 64],
            wrong_signature,
        ))),
        0,
    );

    submit(&node, message.pack_new().unwrap(), None).await;
    wait_until("invalid milestone", || node.metrics.invalid_milestones() == 1).await;

    assert!(!node.tangle.milestones().contains(MilestoneIndex(9)).unwrap());
    assert_eq!(node.tangle.latest_milestone_index(), MilestoneIndex(0));

    node.daemon.shutdown().await;
}
