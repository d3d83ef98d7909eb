// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{packable::Packable, MessageId};
use comb_storage::backend::StorageBackend;

use crate::{
    config::CacheOptions,
    object_storage::{CachedObject, ObjectStorage, StorableObject},
    storage::PREFIX_METADATA,
    Error, MessageMetadata, MilestoneIndex,
};

/// A refcounted handle onto a metadata record.
pub type CachedMetadata<B> = CachedObject<B, MessageMetadata>;

impl StorableObject for MessageMetadata {
    fn from_bytes(_key: &[u8], bytes: &[u8]) -> Result<Self, Error> {
        Ok(MessageMetadata::unpack(&mut &bytes[..])?)
    }

    fn to_bytes(&self) -> Vec<u8> {
        // Packing into a vector cannot fail.
        self.pack_new().expect("packing metadata into a vector failed")
    }
}

/// The store of message metadata, keyed by message id.
pub struct MetadataStore<B: StorageBackend> {
    storage: ObjectStorage<B, MessageMetadata>,
}

impl<B: StorageBackend> MetadataStore<B> {
    pub(crate) fn new(backend: B, options: &CacheOptions) -> Self {
        Self {
            storage: ObjectStorage::new(backend, PREFIX_METADATA, options),
        }
    }

    /// Loads the metadata of a message, creating it from `factory` when absent.
    pub fn get_or_create(
        &self,
        message_id: &MessageId,
        factory: impl FnOnce() -> MessageMetadata,
    ) -> Result<CachedMetadata<B>, Error> {
        self.storage.compute_if_absent(message_id.as_ref(), |_| factory())
    }

    /// Loads the metadata of a message; +1 handle.
    pub fn get(&self, message_id: &MessageId) -> Result<Option<CachedMetadata<B>>, Error> {
        self.storage.load(message_id.as_ref())
    }

    /// Marks a message as solid; a no-op when the metadata is absent.
    pub fn mark_solid(&self, message_id: &MessageId) -> Result<(), Error> {
        if let Some(metadata) = self.storage.load(message_id.as_ref())? {
            metadata.mutate(|metadata| metadata.mark_solid());
        }

        Ok(())
    }

    /// Records the confirming milestone of a message; a no-op when the
    /// metadata is absent.
    pub fn set_confirmed(&self, message_id: &MessageId, index: MilestoneIndex) -> Result<(), Error> {
        if let Some(metadata) = self.storage.load(message_id.as_ref())? {
            metadata.mutate(|metadata| metadata.confirm(index));
        }

        Ok(())
    }

    /// Deletes the metadata of a message.
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
