// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{MessageId, MESSAGE_ID_LENGTH};
use comb_storage::backend::StorageBackend;

use crate::{
    config::CacheOptions,
    object_storage::{ObjectStorage, StorableObject},
    storage::PREFIX_CHILDREN,
    Error,
};

/// A directed back-reference from a parent message to one of its children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Child {
    /// The parent message id.
    pub parent: MessageId,
    /// The child message id.
    pub child: MessageId,
}

impl StorableObject for Child {
    fn from_bytes(key: &[u8], _bytes: &[u8]) -> Result<Self, Error> {
        decode_key(key).ok_or(Error::MalformedRecord)
    }

    fn to_bytes(&self) -> Vec<u8> {
        // The edge is fully encoded in its key.
        Vec::new()
    }
}

fn composite_key(parent: &MessageId, child: &MessageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 * MESSAGE_ID_LENGTH);
    key.extend_from_slice(parent.as_ref());
    key.extend_from_slice(child.as_ref());
    key
}

fn decode_key(key: &[u8]) -> Option<Child> {
    if key.len() != 2 * MESSAGE_ID_LENGTH {
        return None;
    }

    Some(Child {
        parent: MessageId::new(key[..MESSAGE_ID_LENGTH].try_into().ok()?),
        child: MessageId::new(key[MESSAGE_ID_LENGTH..].try_into().ok()?),
    })
}

/// The store of child edges, keyed by `parent id ‖ child id`.
pub struct ChildrenStore<B: StorageBackend> {
    storage: ObjectStorage<B, Child>,
}

impl<B: StorageBackend> ChildrenStore<B> {
    pub(crate) fn new(backend: B, options: &CacheOptions) -> Self {
        Self {
            storage: ObjectStorage::new(backend, PREFIX_CHILDREN, options),
        }
    }

    /// Records that `child` references `parent`.
    pub fn add(&self, parent: &MessageId, child: &MessageId) -> Result<(), Error> {
        let key = composite_key(parent, child);
        let (cached, _) = self.storage.store_if_absent(&key, Child {
            parent: *parent,
            child: *child,
        })?;
        drop(cached);

        Ok(())
    }

    /// Calls `f` with every child of `parent` until it returns `false`.
    pub fn for_each_child_of(&self, parent: &MessageId, mut f: impl FnMut(&MessageId) -> bool) -> Result<(), Error> {
        self.storage.for_each_key_with_prefix(parent.as_ref(), &mut |key| match decode_key(key) {
            Some(edge) => f(&edge.child),
            None => true,
        })
    }

    /// Calls `f` with every stored edge until it returns `false`.
    pub fn for_each(&self, mut f: impl FnMut(&Child) -> bool) -> Result<(), Error> {
        self.storage.for_each_key(&mut |key| match decode_key(key) {
            Some(edge) => f(&edge),
            None => true,
        })
    }

    /// Deletes the edge between `parent` and `child`.
    pub fn delete(&self, parent: &MessageId, child: &MessageId) -> Result<(), Error> {
        self.storage.delete(&composite_key(parent, child))
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
