// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide protocol counters.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    invalid_messages: AtomicU64,
    new_messages: AtomicU64,
    known_messages: AtomicU64,
    invalid_milestones: AtomicU64,
    duplicate_milestones: AtomicU64,
    messages_sent: AtomicU64,
    message_requests_sent: AtomicU64,
}

impl ServerMetrics {
    /// Creates a new `ServerMetrics`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages that failed to decode.
    pub fn invalid_messages(&self) -> u64 {
        self.invalid_messages.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn invalid_messages_inc(&self) {
        self.invalid_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of messages seen for the first time.
    pub fn new_messages(&self) -> u64 {
        self.new_messages.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn new_messages_inc(&self) {
        self.new_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of messages received again after being stored.
    pub fn known_messages(&self) -> u64 {
        self.known_messages.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn known_messages_inc(&self) {
        self.known_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of milestone payloads that failed validation.
    pub fn invalid_milestones(&self) -> u64 {
        self.invalid_milestones.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn invalid_milestones_inc(&self) {
        self.invalid_milestones.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of milestones rejected because their index was already taken.
    pub fn duplicate_milestones(&self) -> u64 {
        self.duplicate_milestones.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn duplicate_milestones_inc(&self) {
        self.duplicate_milestones.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of messages forwarded to peers.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn messages_sent_inc(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of message requests dispatched to peers.
    pub fn message_requests_sent(&self) -> u64 {
        self.message_requests_sent.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn message_requests_sent_inc(&self) {
        self.message_requests_sent.fetch_add(1, Ordering::Relaxed);
    }
}
