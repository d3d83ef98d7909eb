// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{MessageId, MESSAGE_ID_LENGTH};
use comb_storage::backend::StorageBackend;

use crate::{
    config::CacheOptions,
    object_storage::{CachedObject, ObjectStorage, StorableObject},
    storage::PREFIX_MILESTONES,
    Error, MilestoneIndex,
};

/// A refcounted handle onto a milestone entry.
pub type CachedMilestone<B> = CachedObject<B, MilestoneEntry>;

/// A validated milestone, mapping its index to the message that carries it.
///
/// Milestone entries are immutable; there is no update path, a second store
/// under the same index is rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MilestoneEntry {
    index: MilestoneIndex,
    message_id: MessageId,
}

impl MilestoneEntry {
    /// Creates a new `MilestoneEntry`.
    pub fn new(index: MilestoneIndex, message_id: MessageId) -> Self {
        Self { index, message_id }
    }

    /// Returns the milestone index.
    pub fn index(&self) -> MilestoneIndex {
        self.index
    }

    /// Returns the id of the message carrying the milestone payload.
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }
}

impl StorableObject for MilestoneEntry {
    fn from_bytes(key: &[u8], bytes: &[u8]) -> Result<Self, Error> {
        let index = decode_key(key).ok_or(Error::MalformedRecord)?;
        let message_id = MessageId::new(
            <[u8; MESSAGE_ID_LENGTH]>::try_from(bytes).map_err(|_| Error::MalformedRecord)?,
        );

        Ok(Self { index, message_id })
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.message_id.as_ref().to_vec()
    }
}

fn milestone_key(index: MilestoneIndex) -> [u8; 4] {
    index.0.to_be_bytes()
}

fn decode_key(key: &[u8]) -> Option<MilestoneIndex> {
    Some(MilestoneIndex(u32::from_be_bytes(key.try_into().ok()?)))
}

/// The store of validated milestones, keyed by big-endian milestone index.
pub struct MilestoneStore<B: StorageBackend> {
    storage: ObjectStorage<B, MilestoneEntry>,
}

impl<B: StorageBackend> MilestoneStore<B> {
    pub(crate) fn new(backend: B, options: &CacheOptions) -> Self {
        Self {
            storage: ObjectStorage::new(backend, PREFIX_MILESTONES, options),
        }
    }

    /// Stores a milestone unless its index is already taken; `None` when it
    /// is, in which case the existing entry is retained.
    pub fn store_if_absent(&self, entry: MilestoneEntry) -> Result<Option<CachedMilestone<B>>, Error> {
        let key = milestone_key(entry.index());
        let (cached, newly) = self.storage.store_if_absent(&key, entry)?;

        Ok(newly.then_some(cached))
    }

    /// Loads a milestone; +1 handle.
    pub fn get(&self, index: MilestoneIndex) -> Result<Option<CachedMilestone<B>>, Error> {
        self.storage.load(&milestone_key(index))
    }

    /// Returns whether a milestone with the given index is present.
    pub fn contains(&self, index: MilestoneIndex) -> Result<bool, Error> {
        self.storage.contains(&milestone_key(index))
    }

    /// Deletes a milestone.
    pub fn delete(&self, index: MilestoneIndex) -> Result<(), Error> {
        self.storage.delete(&milestone_key(index))
    }

    /// Calls `f` with every stored milestone index, in ascending order, until
    /// it returns `false`.
    pub fn for_each_index(&self, mut f: impl FnMut(MilestoneIndex) -> bool) -> Result<(), Error> {
        self.storage.for_each_key(&mut |key| match decode_key(key) {
            Some(index) => f(index),
            None => true,
        })
    }

    /// Returns the highest milestone index present in the store.
    pub fn latest_index(&self) -> Result<Option<MilestoneIndex>, Error> {
        let mut latest = None;
        self.for_each_index(|index| {
            latest = Some(index);
            true
        })?;

        Ok(latest)
    }

    /// Returns the smallest stored milestone index strictly above `index`.
    pub fn next_index_after(&self, index: MilestoneIndex) -> Result<Option<MilestoneIndex>, Error> {
        let mut next = None;
        self.for_each_index(|candidate| {
            if candidate > index {
                next = Some(candidate);
                false
            } else {
                true
            }
        })?;

        Ok(next)
    }

    /// Persists and clears unreferenced cache entries.
    pub fn flush(&self) -> Result<(), Error> {
        self.storage.flush()
    }

    /// Persists everything and clears the cache.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.storage.shutdown()
    }
}
