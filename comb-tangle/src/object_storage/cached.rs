// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Instant};

use comb_storage::backend::StorageBackend;
use log::warn;

use crate::object_storage::{Entry, EntryState, StorableObject, Storage};

/// A live, refcounted handle onto a cached object.
///
/// Dropping the handle releases its reference; the last release after the
/// cache time persists the entry (if dirty) and evicts it.
pub struct CachedObject<B: StorageBackend, O: StorableObject> {
    storage: Arc<Storage<B, O>>,
    key: Vec<u8>,
    entry: Arc<Entry<O>>,
    force_release: bool,
    acquired_at: Instant,
}

impl<B: StorageBackend, O: StorableObject> CachedObject<B, O> {
    pub(crate) fn new(storage: Arc<Storage<B, O>>, key: Vec<u8>, entry: Arc<Entry<O>>) -> Self {
        Self {
            storage,
            key,
            entry,
            force_release: false,
            acquired_at: Instant::now(),
        }
    }

    /// Returns the storage key of the handle, without the namespace prefix.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Returns whether the handle still points at a present object; `false`
    /// after the key was deleted underneath it.
    pub fn exists(&self) -> bool {
        matches!(self.entry.inner.lock().state, EntryState::Present(_))
    }

    /// Applies `f` to the object, or returns `None` when it was deleted.
    pub fn map<R>(&self, f: impl FnOnce(&O) -> R) -> Option<R> {
        match &self.entry.inner.lock().state {
            EntryState::Present(object) => Some(f(object)),
            _ => None,
        }
    }

    /// Mutates the object through the handle and marks the entry dirty, or
    /// returns `None` when it was deleted.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut O) -> R) -> Option<R> {
        let mut guard = self.entry.inner.lock();

        match &mut guard.state {
            EntryState::Present(object) => {
                let result = f(object);
                guard.dirty = true;
                Some(result)
            }
            _ => None,
        }
    }

    /// Acquires one more reference onto the same entry.
    pub fn retain(&self) -> Self {
        self.entry.inner.lock().refcount += 1;

        Self {
            storage: self.storage.clone(),
            key: self.key.clone(),
            entry: self.entry.clone(),
            force_release: false,
            acquired_at: Instant::now(),
        }
    }

    /// Releases the handle; with `force` the entry is evicted even when its
    /// cache time has not passed yet.
    pub fn release(mut self, force: bool) {
        self.force_release = force;
    }
}

impl<B: StorageBackend, O: StorableObject> Drop for CachedObject<B, O> {
    fn drop(&mut self) {
        if let Some(leak_detection) = &self.storage.leak_detection {
            if self.acquired_at.elapsed() > leak_detection.max_consumer_hold_time {
                warn!(
                    "A consumer of object storage {} held its reference for {:?}; this looks like a leak.",
                    std::any::type_name::<O>(),
                    self.acquired_at.elapsed()
                );
            }
        }

        let mut to_persist = None;
        let mut should_evict = false;

        {
            let mut guard = self.entry.inner.lock();
            guard.refcount -= 1;

            if guard.refcount == 0 && (self.force_release || Instant::now() >= guard.evict_after) {
                if guard.dirty {
                    if let EntryState::Present(object) = &guard.state {
                        to_persist = Some(object.to_bytes());
                    }
                    guard.dirty = false;
                }
                should_evict = true;
            }
        }

        if let Some(bytes) = to_persist {
            if let Err(e) = self.storage.backend.insert(&self.storage.storage_key(&self.key), &bytes) {
                // The storage is about to be flagged unhealthy anyway; the
                // next flush retries nothing, revalidation repairs.
                log::error!("Persisting an evicted cache entry failed: {}.", e);
            }
        }

        if should_evict {
            let mut entries = self.storage.entries.lock();
            let mut guard = self.entry.inner.lock();

            if guard.refcount == 0
                && !guard.dirty
                && entries.get(&self.key).map_or(false, |e| Arc::ptr_eq(e, &self.entry))
            {
                entries.remove(&self.key);
                guard.state = EntryState::Evicted;
            }
        }
    }
}
