// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The registry of connected peers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::trace;
use rand::Rng;
use tokio::sync::mpsc;

/// The identity of a connected peer.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a new `PeerId` from the remote endpoint of a peer.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }
}

impl core::fmt::Display for PeerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-peer protocol counters.
#[derive(Debug, Default)]
pub struct PeerMetrics {
    invalid_messages: AtomicU64,
    new_messages: AtomicU64,
    known_messages: AtomicU64,
}

impl PeerMetrics {
    /// Number of undecodable messages received from this peer.
    pub fn invalid_messages(&self) -> u64 {
        self.invalid_messages.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn invalid_messages_inc(&self) {
        self.invalid_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of new messages received from this peer.
    pub fn new_messages(&self) -> u64 {
        self.new_messages.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn new_messages_inc(&self) {
        self.new_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of already known messages received from this peer.
    pub fn known_messages(&self) -> u64 {
        self.known_messages.load(Ordering::Relaxed)
    }

    /// Increments the counter.
    pub fn known_messages_inc(&self) {
        self.known_messages.fetch_add(1, Ordering::Relaxed);
    }
}

/// A connected peer: its identity, an outbound frame channel drained by the
/// connection writer, and its counters.
pub struct Peer {
    id: PeerId,
    alias: Option<String>,
    gossip_tx: mpsc::UnboundedSender<Vec<u8>>,
    metrics: PeerMetrics,
}

impl Peer {
    /// Creates a new `Peer`.
    pub fn new(id: PeerId, alias: Option<String>, gossip_tx: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            id,
            alias,
            gossip_tx,
            metrics: PeerMetrics::default(),
        }
    }

    /// Returns the identity of the peer.
    pub fn id(&self) -> &PeerId {
        &self.id
    }

    /// Returns the configured alias of the peer, or its identity.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.id.0)
    }

    /// Returns the counters of the peer.
    pub fn metrics(&self) -> &PeerMetrics {
        &self.metrics
    }

    /// Queues a frame to be written to the peer; `false` when the connection
    /// writer is gone.
    pub fn send(&self, frame: Vec<u8>) -> bool {
        self.gossip_tx.send(frame).is_ok()
    }
}

/// The registry of all currently connected peers.
#[derive(Default)]
pub struct PeerManager {
    peers: DashMap<PeerId, Arc<Peer>>,
}

impl PeerManager {
    /// Creates a new, empty `PeerManager`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer to the registry.
    pub fn add(&self, peer: Arc<Peer>) {
        trace!("Adding peer {}.", peer.alias());
        self.peers.insert(peer.id().clone(), peer);
    }

    /// Removes a peer from the registry.
    pub fn remove(&self, id: &PeerId) {
        trace!("Removing peer {}.", id);
        self.peers.remove(id);
    }

    /// Returns a peer by identity.
    pub fn get(&self, id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.get(id).map(|peer| peer.clone())
    }

    /// Returns the number of connected peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns whether no peer is connected.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Sends a frame to every connected peer except `except`; returns the
    /// number of peers the frame was queued for.
    pub fn broadcast(&self, frame: &[u8], except: Option<&PeerId>) -> usize {
        let mut sent = 0;

        for peer in self.peers.iter() {
            if Some(peer.id()) == except {
                continue;
            }
            if peer.send(frame.to_vec()) {
                sent += 1;
            }
        }

        sent
    }

    /// Sends a frame to one randomly chosen peer; `false` when no peer took it.
    pub fn send_to_random(&self, frame: Vec<u8>) -> bool {
        let peers: Vec<Arc<Peer>> = self.peers.iter().map(|peer| peer.clone()).collect();

        if peers.is_empty() {
            return false;
        }

        let start = rand::thread_rng().gen_range(0..peers.len());

        (0..peers.len()).any(|i| peers[(start + i) % peers.len()].send(frame.clone()))
    }
}
