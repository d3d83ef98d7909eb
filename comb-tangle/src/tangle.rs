// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU32, Ordering};

use comb_message::{
    packable::Packable,
    Message, MessageId,
};
use comb_storage::{
    backend::StorageBackend,
    system::{PREFIX_SYSTEM, SYSTEM_KEY_SNAPSHOT_INFO},
};
use dashmap::DashMap;

use crate::{
    config::TangleConfig,
    storage::{
        CachedMessage, ChildrenStore, MessageStore, MetadataStore, MilestoneStore, UnconfirmedMessageStore,
    },
    Error, MilestoneIndex, SnapshotInfo,
};

/// The number of milestones a node may lag behind and still treat itself as
/// synced for intake purposes.
const SYNC_THRESHOLD: u32 = 2;

fn snapshot_info_key() -> [u8; 2] {
    [PREFIX_SYSTEM, SYSTEM_KEY_SNAPSHOT_INFO]
}

/// The tangle: every entity store plus the milestone state of the node.
///
/// All milestone indexes are monotonic for the lifetime of a run; they only
/// move backwards through revalidation, which happens before the tangle is
/// handed to any worker.
pub struct Tangle<B: StorageBackend> {
    backend: B,
    messages: MessageStore<B>,
    metadata: MetadataStore<B>,
    children: ChildrenStore<B>,
    milestones: MilestoneStore<B>,
    unconfirmed: UnconfirmedMessageStore<B>,
    solid_entry_points: DashMap<MessageId, MilestoneIndex>,
    latest_milestone_index: AtomicU32,
    solid_milestone_index: AtomicU32,
    snapshot_index: AtomicU32,
    pruning_index: AtomicU32,
}

impl<B: StorageBackend> Tangle<B> {
    /// Opens the tangle over a backend, loading the snapshot state if present.
    pub fn new(backend: B, config: &TangleConfig) -> Result<Self, Error> {
        let tangle = Self {
            messages: MessageStore::new(backend.clone(), &config.messages),
            metadata: MetadataStore::new(backend.clone(), &config.metadata),
            children: ChildrenStore::new(backend.clone(), &config.children),
            milestones: MilestoneStore::new(backend.clone(), &config.milestones),
            unconfirmed: UnconfirmedMessageStore::new(backend.clone(), &config.unconfirmed_messages),
            backend,
            solid_entry_points: DashMap::new(),
            latest_milestone_index: AtomicU32::new(0),
            solid_milestone_index: AtomicU32::new(0),
            snapshot_index: AtomicU32::new(0),
            pruning_index: AtomicU32::new(0),
        };

        if let Some(info) = tangle.snapshot_info()? {
            tangle.apply_snapshot_state(&info);
        }

        Ok(tangle)
    }

    fn apply_snapshot_state(&self, info: &SnapshotInfo) {
        self.snapshot_index.store(*info.snapshot_index(), Ordering::Relaxed);
        self.pruning_index.store(*info.pruning_index(), Ordering::Relaxed);
        self.solid_milestone_index.store(*info.snapshot_index(), Ordering::Relaxed);
        self.latest_milestone_index
            .fetch_max(*info.snapshot_index(), Ordering::Relaxed);

        self.solid_entry_points.clear();
        for (message_id, index) in info.entry_points() {
            self.solid_entry_points.insert(*message_id, *index);
        }
    }

    /// Returns the underlying storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the message store.
    pub fn messages(&self) -> &MessageStore<B> {
        &self.messages
    }

    /// Returns the metadata store.
    pub fn metadata(&self) -> &MetadataStore<B> {
        &self.metadata
    }

    /// Returns the child-edge store.
    pub fn children(&self) -> &ChildrenStore<B> {
        &self.children
    }

    /// Returns the milestone store.
    pub fn milestones(&self) -> &MilestoneStore<B> {
        &self.milestones
    }

    /// Returns the unconfirmed-message store.
    pub fn unconfirmed(&self) -> &UnconfirmedMessageStore<B> {
        &self.unconfirmed
    }

    /// Loads a message; +1 handle.
    pub fn get(&self, message_id: &MessageId) -> Result<Option<CachedMessage<B>>, Error> {
        self.messages.get(message_id)
    }

    /// Returns whether a message is present.
    pub fn contains(&self, message_id: &MessageId) -> Result<bool, Error> {
        self.messages.contains(message_id)
    }

    /// Stores a message unless it is already present; +1 handle either way.
    pub fn insert(&self, message_id: &MessageId, message: Message) -> Result<(CachedMessage<B>, bool), Error> {
        self.messages.store_if_absent(message_id, message)
    }

    /// Returns the latest known milestone index.
    pub fn latest_milestone_index(&self) -> MilestoneIndex {
        MilestoneIndex(self.latest_milestone_index.load(Ordering::Relaxed))
    }

    /// Raises the latest known milestone index; lower values are ignored.
    pub fn update_latest_milestone_index(&self, index: MilestoneIndex) {
        self.latest_milestone_index.fetch_max(*index, Ordering::Relaxed);
    }

    /// Returns the latest solid milestone index.
    pub fn solid_milestone_index(&self) -> MilestoneIndex {
        MilestoneIndex(self.solid_milestone_index.load(Ordering::Relaxed))
    }

    /// Raises the latest solid milestone index; lower values are ignored.
    pub fn update_solid_milestone_index(&self, index: MilestoneIndex) {
        self.solid_milestone_index.fetch_max(*index, Ordering::Relaxed);
    }

    /// Returns the milestone index of the local snapshot.
    pub fn snapshot_index(&self) -> MilestoneIndex {
        MilestoneIndex(self.snapshot_index.load(Ordering::Relaxed))
    }

    /// Returns the milestone index of the last pruning run.
    pub fn pruning_index(&self) -> MilestoneIndex {
        MilestoneIndex(self.pruning_index.load(Ordering::Relaxed))
    }

    /// Returns whether the node is fully synced: the latest milestone is
    /// known and solid.
    pub fn is_synced(&self) -> bool {
        let latest = self.latest_milestone_index();

        *latest != 0 && self.solid_milestone_index() == latest
    }

    /// Returns whether the node is synced up to the threshold tolerance.
    pub fn is_synced_threshold(&self) -> bool {
        let latest = self.latest_milestone_index();

        *latest != 0 && *self.solid_milestone_index() + SYNC_THRESHOLD >= *latest
    }

    /// Returns whether a message id is a solid entry point of the snapshot.
    pub fn is_solid_entry_point(&self, message_id: &MessageId) -> bool {
        message_id.is_null() || self.solid_entry_points.contains_key(message_id)
    }

    /// Reads the snapshot information record.
    pub fn snapshot_info(&self) -> Result<Option<SnapshotInfo>, Error> {
        match self.backend.fetch(&snapshot_info_key()).map_err(Error::Storage)? {
            Some(bytes) => Ok(Some(SnapshotInfo::unpack(&mut &bytes[..])?)),
            None => Ok(None),
        }
    }

    /// Replaces the snapshot information record and applies it to the
    /// in-memory state: snapshot/pruning indexes, solid milestone index and
    /// the solid entry points.
    pub fn replace_snapshot_info(&self, info: SnapshotInfo) -> Result<(), Error> {
        // Packing into a vector cannot fail.
        let bytes = info.pack_new().expect("packing snapshot info into a vector failed");
        self.backend.insert(&snapshot_info_key(), &bytes).map_err(Error::Storage)?;
        self.backend.flush().map_err(Error::Storage)?;

        self.apply_snapshot_state(&info);

        Ok(())
    }

    /// Flushes every store and the backend.
    pub fn flush(&self) -> Result<(), Error> {
        self.messages.flush()?;
        self.metadata.flush()?;
        self.children.flush()?;
        self.milestones.flush()?;
        self.unconfirmed.flush()?;
        self.backend.flush().map_err(Error::Storage)?;

        Ok(())
    }

    /// Persists every cached entry and clears the caches; the backend itself
    /// stays open for the node to close.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.messages.shutdown()?;
        self.metadata.shutdown()?;
        self.children.shutdown()?;
        self.milestones.shutdown()?;
        self.unconfirmed.shutdown()?;
        self.backend.flush().map_err(Error::Storage)?;

        Ok(())
    }
}
