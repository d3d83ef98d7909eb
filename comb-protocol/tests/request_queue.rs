// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use comb_message::MessageId;
use comb_protocol::request::RequestQueue;
use comb_tangle::MilestoneIndex;

fn id(tag: u8) -> MessageId {
    MessageId::new([tag; 32])
}

#[test]
fn enqueue_is_idempotent_across_states() {
    let queue = RequestQueue::new();

    assert!(queue.enqueue(id(1), MilestoneIndex(5)));
    assert!(!queue.enqueue(id(1), MilestoneIndex(3)));

    let request = queue.next().unwrap();
    assert_eq!(request.message_id, id(1));

    // Pending now; still no second request.
    assert!(!queue.enqueue(id(1), MilestoneIndex(3)));

    queue.mark_processing(&id(1));
    assert!(!queue.enqueue(id(1), MilestoneIndex(3)));

    queue.processed(&id(1));
    assert!(queue.enqueue(id(1), MilestoneIndex(3)));
}

#[test]
fn priority_is_by_milestone_then_fifo() {
    let queue = RequestQueue::new();

    queue.enqueue(id(1), MilestoneIndex(9));
    queue.enqueue(id(2), MilestoneIndex(5));
    queue.enqueue(id(3), MilestoneIndex(5));
    queue.enqueue(id(4), MilestoneIndex(7));

    let order: Vec<MessageId> = std::iter::from_fn(|| queue.next().map(|r| r.message_id)).collect();

    assert_eq!(order, vec![id(2), id(3), id(4), id(1)]);
}

#[test]
fn size_is_conserved_across_transitions() {
    let queue = RequestQueue::new();

    for tag in 0..10u8 {
        queue.enqueue(id(tag), MilestoneIndex(1));
    }
    assert_eq!(queue.size(), (10, 0, 0));

    for _ in 0..4 {
        queue.next().unwrap();
    }
    assert_eq!(queue.size(), (6, 4, 0));

    queue.mark_processing(&id(0));
    queue.mark_processing(&id(1));
    assert_eq!(queue.size(), (6, 2, 2));

    // Nothing leaves the queue except through `processed`.
    let (queued, pending, processing) = queue.size();
    assert_eq!(queued + pending + processing, 10);

    queue.processed(&id(0));
    let (queued, pending, processing) = queue.size();
    assert_eq!(queued + pending + processing, 9);

    assert!(!queue.is_empty());
}

#[test]
fn peek_does_not_dispatch() {
    let queue = RequestQueue::new();

    queue.enqueue(id(1), MilestoneIndex(2));

    let peeked = queue.peek().unwrap();
    assert_eq!(peeked.message_id, id(1));
    assert_eq!(peeked.milestone_index, MilestoneIndex(2));
    assert_eq!(queue.size(), (1, 0, 0));
}

#[test]
fn timed_out_requests_requeue_at_bucket_tail() {
    let queue = RequestQueue::new();

    queue.enqueue(id(1), MilestoneIndex(5));
    queue.next().unwrap();

    queue.enqueue(id(2), MilestoneIndex(5));

    // A zero timeout expires the pending request immediately.
    assert_eq!(queue.requeue_timed_out(Duration::ZERO), 1);
    assert_eq!(queue.size(), (2, 0, 0));

    // The requeued request sits behind the one that was already waiting.
    assert_eq!(queue.next().unwrap().message_id, id(2));
    assert_eq!(queue.next().unwrap().message_id, id(1));
}

#[test]
fn latency_is_recorded_on_processing() {
    let queue = RequestQueue::new();

    assert_eq!(queue.avg_latency(), 0);

    queue.enqueue(id(1), MilestoneIndex(1));
    queue.next().unwrap();
    queue.mark_processing(&id(1));

    // The answer arrived within the test run; the average is small but recorded.
    assert!(queue.avg_latency() < 1000);
    queue.processed(&id(1));
    assert!(queue.is_empty());
}
