// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The queue of outstanding message requests.
//!
//! A request lives in exactly one of three states: queued (waiting to be
//! dispatched), pending (sent to a peer, waiting for the answer) or
//! processing (the answer arrived and is being persisted). There is at most
//! one request per message id across all three states; a request only leaves
//! the queue through [`RequestQueue::processed`].

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap, VecDeque},
    time::{Duration, Instant},
};

use comb_message::MessageId;
use comb_tangle::MilestoneIndex;
use parking_lot::Mutex;

const LATENCY_WINDOW: usize = 100;

/// A request for a message, prioritized by the milestone index it is needed for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Request {
    /// The id of the requested message.
    pub message_id: MessageId,
    /// The milestone index the request belongs to; older milestones first.
    pub milestone_index: MilestoneIndex,
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Phase {
    Queued,
    Pending { sent_at: Instant },
    Processing,
}

struct State {
    milestone_index: MilestoneIndex,
    phase: Phase,
}

#[derive(Default)]
struct Inner {
    states: HashMap<MessageId, State>,
    // Min-heap on (milestone index, arrival sequence); entries are lazily
    // discarded when their state moved on.
    heap: BinaryHeap<Reverse<(u32, u64, MessageId)>>,
    sequence: u64,
    latencies: VecDeque<u64>,
}

impl Inner {
    fn push_queued(&mut self, message_id: MessageId, milestone_index: MilestoneIndex) {
        self.sequence += 1;
        self.heap.push(Reverse((*milestone_index, self.sequence, message_id)));
    }

    // Drops heap entries whose request is no longer queued.
    fn skim(&mut self) {
        while let Some(&Reverse((_, _, message_id))) = self.heap.peek() {
            match self.states.get(&message_id) {
                Some(state) if matches!(state.phase, Phase::Queued) => return,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}

/// The queue of outstanding message requests.
#[derive(Default)]
pub struct RequestQueue {
    inner: Mutex<Inner>,
}

impl RequestQueue {
    /// Creates a new, empty `RequestQueue`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a request unless one already exists for the message id, in
    /// any state. Returns whether the request was added.
    pub fn enqueue(&self, message_id: MessageId, milestone_index: MilestoneIndex) -> bool {
        let mut inner = self.inner.lock();

        if inner.states.contains_key(&message_id) {
            return false;
        }

        inner.states.insert(message_id, State {
            milestone_index,
            phase: Phase::Queued,
        });
        inner.push_queued(message_id, milestone_index);

        true
    }

    /// Moves the most urgent queued request to pending and returns it for
    /// dispatch.
    pub fn next(&self) -> Option<Request> {
        let mut inner = self.inner.lock();

        inner.skim();

        let Reverse((_, _, message_id)) = inner.heap.pop()?;
        // skim left a queued state on top.
        let state = inner.states.get_mut(&message_id).unwrap();
        state.phase = Phase::Pending { sent_at: Instant::now() };

        Some(Request {
            message_id,
            milestone_index: state.milestone_index,
        })
    }

    /// Returns the most urgent queued request without dispatching it.
    pub fn peek(&self) -> Option<Request> {
        let mut inner = self.inner.lock();

        inner.skim();

        let Reverse((index, _, message_id)) = inner.heap.peek()?;

        Some(Request {
            message_id: *message_id,
            milestone_index: MilestoneIndex(*index),
        })
    }

    /// Marks the request of a message id as being processed; a no-op when no
    /// request exists.
    pub fn mark_processing(&self, message_id: &MessageId) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        if let Some(state) = inner.states.get_mut(message_id) {
            if let Phase::Pending { sent_at } = state.phase {
                let latency = sent_at.elapsed().as_millis() as u64;
                if inner.latencies.len() == LATENCY_WINDOW {
                    inner.latencies.pop_front();
                }
                inner.latencies.push_back(latency);
            }

            state.phase = Phase::Processing;
        }
    }

    /// Removes the request of a message id, in whatever state it is. The
    /// message must be persisted by the time this is called.
    pub fn processed(&self, message_id: &MessageId) {
        self.inner.lock().states.remove(message_id);
    }

    /// Returns the number of requests per state: `(queued, pending, processing)`.
    pub fn size(&self) -> (usize, usize, usize) {
        let inner = self.inner.lock();

        let mut sizes = (0, 0, 0);
        for state in inner.states.values() {
            match state.phase {
                Phase::Queued => sizes.0 += 1,
                Phase::Pending { .. } => sizes.1 += 1,
                Phase::Processing => sizes.2 += 1,
            }
        }

        sizes
    }

    /// Returns whether no request exists in any state.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().states.is_empty()
    }

    /// Returns whether a request exists for the message id, in any state.
    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.inner.lock().states.contains_key(message_id)
    }

    /// Returns the request of a message id, in whatever state it is.
    pub fn get(&self, message_id: &MessageId) -> Option<Request> {
        self.inner.lock().states.get(message_id).map(|state| Request {
            message_id: *message_id,
            milestone_index: state.milestone_index,
        })
    }

    /// Returns the average answer latency over the recent window, in
    /// milliseconds.
    pub fn avg_latency(&self) -> u64 {
        let inner = self.inner.lock();

        if inner.latencies.is_empty() {
            return 0;
        }

        inner.latencies.iter().sum::<u64>() / inner.latencies.len() as u64
    }

    /// Requeues every pending request older than `timeout` at the tail of its
    /// milestone bucket. Returns the number of requeued requests.
    pub fn requeue_timed_out(&self, timeout: Duration) -> usize {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        let timed_out: Vec<(MessageId, MilestoneIndex)> = inner
            .states
            .iter()
            .filter_map(|(message_id, state)| match state.phase {
                Phase::Pending { sent_at } if now.duration_since(sent_at) >= timeout => {
                    Some((*message_id, state.milestone_index))
                }
                _ => None,
            })
            .collect();

        for (message_id, milestone_index) in &timed_out {
            // The sequence counter keeps growing, so a requeued request lands
            // behind everything queued for the same milestone.
            inner.states.get_mut(message_id).unwrap().phase = Phase::Queued;
            inner.push_queued(*message_id, *milestone_index);
        }

        timed_out.len()
    }
}
