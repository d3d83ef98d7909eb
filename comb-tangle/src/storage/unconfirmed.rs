// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{MessageId, MESSAGE_ID_LENGTH};
use comb_storage::backend::StorageBackend;

use crate::{
    config::CacheOptions,
    object_storage::{ObjectStorage, StorableObject},
    storage::PREFIX_UNCONFIRMED,
    Error, MilestoneIndex,
};

/// A message that was not yet confirmed when it arrived, bucketed by the
/// latest milestone index at arrival time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnconfirmedMessage {
    /// The latest milestone index when the message arrived.
    pub index: MilestoneIndex,
    /// The message id.
    pub message_id: MessageId,
}

impl StorableObject for UnconfirmedMessage {
    fn from_bytes(key: &[u8], _bytes: &[u8]) -> Result<Self, Error> {
        decode_key(key).ok_or(Error::MalformedRecord)
    }

    fn to_bytes(&self) -> Vec<u8> {
        // The record is fully encoded in its key.
        Vec::new()
    }
}

fn composite_key(index: MilestoneIndex, message_id: &MessageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + MESSAGE_ID_LENGTH);
    key.extend_from_slice(&index.0.to_be_bytes());
    key.extend_from_slice(message_id.as_ref());
    key
}

fn decode_key(key: &[u8]) -> Option<UnconfirmedMessage> {
    if key.len() != 4 + MESSAGE_ID_LENGTH {
        return None;
    }

    Some(UnconfirmedMessage {
        index: MilestoneIndex(u32::from_be_bytes(key[..4].try_into().ok()?)),
        message_id: MessageId::new(key[4..].try_into().ok()?),
    })
}

/// The store of unconfirmed messages, keyed by `milestone index ‖ message id`.
pub struct UnconfirmedMessageStore<B: StorageBackend> {
    storage: ObjectStorage<B, UnconfirmedMessage>,
}

impl<B: StorageBackend> UnconfirmedMessageStore<B> {
    pub(crate) fn new(backend: B, options: &CacheOptions) -> Self {
        Self {
            storage: ObjectStorage::new(backend, PREFIX_UNCONFIRMED, options),
        }
    }

    /// Records a message as unconfirmed under the given milestone bucket.
    pub fn add(&self, index: MilestoneIndex, message_id: &MessageId) -> Result<(), Error> {
        let key = composite_key(index, message_id);
        let (cached, _) = self.storage.store_if_absent(&key, UnconfirmedMessage {
            index,
            message_id: *message_id,
        })?;
        drop(cached);

        Ok(())
    }

    /// Calls `f` with every unconfirmed message of a bucket until it returns `false`.
    pub fn for_each_at_index(&self, index: MilestoneIndex, mut f: impl FnMut(&MessageId) -> bool) -> Result<(), Error> {
        self.storage
            .for_each_key_with_prefix(&index.0.to_be_bytes(), &mut |key| match decode_key(key) {
                Some(unconfirmed) => f(&unconfirmed.message_id),
                None => true,
            })
    }

    /// Calls `f` with every stored record until it returns `false`.
    pub fn for_each(&self, mut f: impl FnMut(&UnconfirmedMessage) -> bool) -> Result<(), Error> {
        self.storage.for_each_key(&mut |key| match decode_key(key) {
            Some(unconfirmed) => f(&unconfirmed),
            None => true,
        })
    }

    /// Deletes a whole milestone bucket.
    pub fn delete_at_index(&self, index: MilestoneIndex) -> Result<(), Error> {
        let mut message_ids = Vec::new();
        self.for_each_at_index(index, |message_id| {
            message_ids.push(*message_id);
            true
        })?;

        for message_id in message_ids {
            self.storage.delete(&composite_key(index, &message_id))?;
        }

        Ok(())
    }

    /// Deletes a single record.
    pub fn delete(&self, index: MilestoneIndex, message_id: &MessageId) -> Result<(), Error> {
        self.storage.delete(&composite_key(index, message_id))
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
