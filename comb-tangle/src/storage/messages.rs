// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{packable::Packable, Message, MessageId};
use comb_storage::backend::StorageBackend;

use crate::{
    config::CacheOptions,
    object_storage::{CachedObject, ObjectStorage, StorableObject},
    storage::PREFIX_MESSAGES,
    Error,
};

/// A refcounted handle onto a stored message.
pub type CachedMessage<B> = CachedObject<B, Message>;

impl StorableObject for Message {
    fn from_bytes(_key: &[u8], bytes: &[u8]) -> Result<Self, Error> {
        Ok(Message::unpack(&mut &bytes[..])?)
    }

    fn to_bytes(&self) -> Vec<u8> {
        // Packing into a vector cannot fail.
        self.pack_new().expect("packing a message into a vector failed")
    }
}

/// The store of all messages, keyed by message id.
pub struct MessageStore<B: StorageBackend> {
    storage: ObjectStorage<B, Message>,
}

impl<B: StorageBackend> MessageStore<B> {
    pub(crate) fn new(backend: B, options: &CacheOptions) -> Self {
        Self {
            storage: ObjectStorage::new(backend, PREFIX_MESSAGES, options),
        }
    }

    /// Stores a message unless its id is already present; returns a +1 handle
    /// and whether the message was newly added.
    pub fn store_if_absent(&self, message_id: &MessageId, message: Message) -> Result<(CachedMessage<B>, bool), Error> {
        self.storage.store_if_absent(message_id.as_ref(), message)
    }

    /// Loads a message; +1 handle.
    pub fn get(&self, message_id: &MessageId) -> Result<Option<CachedMessage<B>>, Error> {
        self.storage.load(message_id.as_ref())
    }

    /// Returns whether a message is present.
    pub fn contains(&self, message_id: &MessageId) -> Result<bool, Error> {
        self.storage.contains(message_id.as_ref())
    }

    /// Deletes a message.
    pub fn delete(&self, message_id: &MessageId) -> Result<(), Error> {
        self.storage.delete(message_id.as_ref())
    }

    /// Calls `f` with every stored message id until it returns `false`.
    pub fn for_each_id(&self, mut f: impl FnMut(&MessageId) -> bool) -> Result<(), Error> {
        self.storage.for_each_key(&mut |key| match <[u8; 32]>::try_from(key) {
            Ok(bytes) => f(&MessageId::new(bytes)),
            Err(_) => true,
        })
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
