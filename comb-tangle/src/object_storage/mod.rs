// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! A refcounted object cache in front of the key-value storage.
//!
//! For every key there is at most one materialized object in memory at a
//! time; concurrent loads of the same key block until the in-flight
//! materialization resolves and observe the same instance. External holders
//! get [`CachedObject`] handles that keep the entry alive; once the last
//! handle is released and the cache time has passed, the entry is persisted
//! (if dirty) and evicted.

mod cached;

pub use self::cached::CachedObject;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use comb_storage::backend::StorageBackend;
use parking_lot::{Condvar, Mutex};

use crate::{config::CacheOptions, Error};

/// An object that can live in an [`ObjectStorage`].
pub trait StorableObject: Send + Sync + Sized + 'static {
    /// Decodes an object from its storage key (without the namespace prefix)
    /// and its value bytes.
    fn from_bytes(key: &[u8], bytes: &[u8]) -> Result<Self, Error>;

    /// Encodes the object into its value bytes.
    fn to_bytes(&self) -> Vec<u8>;
}

pub(crate) enum EntryState<O> {
    /// A materialization is in flight; waiters block on the condvar.
    Loading,
    /// The object is materialized.
    Present(O),
    /// The key is known to be absent from cache and store.
    Absent,
    /// The entry was removed from the map; holders must retry.
    Evicted,
}

pub(crate) struct EntryInner<O> {
    pub(crate) state: EntryState<O>,
    pub(crate) refcount: u32,
    pub(crate) dirty: bool,
    pub(crate) evict_after: Instant,
}

pub(crate) struct Entry<O> {
    pub(crate) inner: Mutex<EntryInner<O>>,
    pub(crate) loaded: Condvar,
}

impl<O> Entry<O> {
    fn new_loading(refcount: u32, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(EntryInner {
                state: EntryState::Loading,
                refcount,
                dirty: false,
                evict_after: Instant::now() + ttl,
            }),
            loaded: Condvar::new(),
        }
    }
}

pub(crate) struct Storage<B, O> {
    pub(crate) backend: B,
    pub(crate) prefix: u8,
    pub(crate) ttl: Duration,
    pub(crate) leak_detection: Option<crate::config::LeakDetectionOptions>,
    // Lock order: this map lock first, entry locks second, never the other
    // way around. An entry is in the map iff its state is not `Evicted`.
    pub(crate) entries: Mutex<HashMap<Vec<u8>, Arc<Entry<O>>>>,
}

impl<B: StorageBackend, O: StorableObject> Storage<B, O> {
    pub(crate) fn storage_key(&self, key: &[u8]) -> Vec<u8> {
        let mut storage_key = Vec::with_capacity(1 + key.len());
        storage_key.push(self.prefix);
        storage_key.extend_from_slice(key);
        storage_key
    }
}

/// A refcounted, TTL-backed cache of `O` objects under one namespace prefix.
pub struct ObjectStorage<B, O> {
    inner: Arc<Storage<B, O>>,
}

impl<B, O> Clone for ObjectStorage<B, O> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

enum Found<O> {
    Materializer(Arc<Entry<O>>),
    Existing(Arc<Entry<O>>),
}

impl<B: StorageBackend, O: StorableObject> ObjectStorage<B, O> {
    /// Creates a new `ObjectStorage` over the given backend and namespace prefix.
    pub fn new(backend: B, prefix: u8, options: &CacheOptions) -> Self {
        Self {
            inner: Arc::new(Storage {
                backend,
                prefix,
                ttl: options.cache_time,
                leak_detection: options.leak_detection,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Looks up or creates the entry of a key. The creator becomes the
    /// materializer and owns the backend fetch.
    fn entry(&self, key: &[u8]) -> Found<O> {
        let mut entries = self.inner.entries.lock();

        match entries.get(key) {
            Some(entry) => Found::Existing(entry.clone()),
            None => {
                let entry = Arc::new(Entry::new_loading(1, self.inner.ttl));
                entries.insert(key.to_vec(), entry.clone());
                Found::Materializer(entry)
            }
        }
    }

    /// Resolves the in-flight materialization of an existing entry and
    /// returns its settled state guard, or `None` when the entry was evicted
    /// concurrently and the operation must retry.
    fn settle<'a>(&self, entry: &'a Entry<O>) -> Option<parking_lot::MutexGuard<'a, EntryInner<O>>> {
        let mut guard = entry.inner.lock();

        while matches!(guard.state, EntryState::Loading) {
            entry.loaded.wait(&mut guard);
        }

        if matches!(guard.state, EntryState::Evicted) {
            None
        } else {
            Some(guard)
        }
    }

    /// Completes a materialization: fetches the value from the backend and
    /// settles the entry. Returns a handle when the key exists.
    fn materialize(&self, key: &[u8], entry: Arc<Entry<O>>) -> Result<Option<CachedObject<B, O>>, Error> {
        let fetched = self
            .inner
            .backend
            .fetch(&self.inner.storage_key(key))
            .map_err(Error::Storage)
            .and_then(|bytes| bytes.map(|bytes| O::from_bytes(key, &bytes)).transpose());

        match fetched {
            Ok(Some(object)) => {
                let mut guard = entry.inner.lock();
                guard.state = EntryState::Present(object);
                guard.evict_after = Instant::now() + self.inner.ttl;
                drop(guard);
                entry.loaded.notify_all();

                Ok(Some(CachedObject::new(self.inner.clone(), key.to_vec(), entry)))
            }
            Ok(None) => {
                self.abandon(key, &entry);

                Ok(None)
            }
            Err(e) => {
                self.abandon(key, &entry);

                Err(e)
            }
        }
    }

    /// Settles a failed or absent materialization and drops the entry from
    /// the map so later operations hit the backend again.
    fn abandon(&self, key: &[u8], entry: &Arc<Entry<O>>) {
        let mut entries = self.inner.entries.lock();
        let mut guard = entry.inner.lock();

        guard.refcount = 0;
        guard.state = EntryState::Absent;
        drop(guard);
        entry.loaded.notify_all();

        if entries.get(key).map_or(false, |e| Arc::ptr_eq(e, entry)) {
            entries.remove(key);
            entry.inner.lock().state = EntryState::Evicted;
        }
    }

    /// Loads the object of a key from cache or store; +1 on the refcount of
    /// the returned handle.
    pub fn load(&self, key: &[u8]) -> Result<Option<CachedObject<B, O>>, Error> {
        loop {
            match self.entry(key) {
                Found::Materializer(entry) => return self.materialize(key, entry),
                Found::Existing(entry) => {
                    let Some(mut guard) = self.settle(&entry) else {
                        continue;
                    };

                    match guard.state {
                        EntryState::Present(_) => {
                            guard.refcount += 1;
                            guard.evict_after = Instant::now() + self.inner.ttl;
                            let refcount = guard.refcount;
                            drop(guard);

                            self.check_consumers(refcount);

                            return Ok(Some(CachedObject::new(self.inner.clone(), key.to_vec(), entry)));
                        }
                        EntryState::Absent => return Ok(None),
                        _ => unreachable!("entry settled into an unsettled state"),
                    }
                }
            }
        }
    }

    /// Materializes `object` under `key` unless the key already exists in
    /// cache or store. Returns a +1 handle to the winning object and whether
    /// the passed object was newly added.
    pub fn store_if_absent(&self, key: &[u8], object: O) -> Result<(CachedObject<B, O>, bool), Error> {
        loop {
            match self.entry(key) {
                Found::Materializer(entry) => {
                    // We own the materialization: check the backend before
                    // declaring the object new.
                    let fetched = self
                        .inner
                        .backend
                        .fetch(&self.inner.storage_key(key))
                        .map_err(Error::Storage)
                        .and_then(|bytes| bytes.map(|bytes| O::from_bytes(key, &bytes)).transpose());

                    match fetched {
                        Ok(Some(existing)) => {
                            let mut guard = entry.inner.lock();
                            guard.state = EntryState::Present(existing);
                            guard.evict_after = Instant::now() + self.inner.ttl;
                            drop(guard);
                            entry.loaded.notify_all();

                            return Ok((CachedObject::new(self.inner.clone(), key.to_vec(), entry), false));
                        }
                        Ok(None) => {
                            // Write through so the entity exists in the store
                            // from the moment it is observable in the cache.
                            self.inner
                                .backend
                                .insert(&self.inner.storage_key(key), &object.to_bytes())?;

                            let mut guard = entry.inner.lock();
                            guard.state = EntryState::Present(object);
                            guard.evict_after = Instant::now() + self.inner.ttl;
                            drop(guard);
                            entry.loaded.notify_all();

                            return Ok((CachedObject::new(self.inner.clone(), key.to_vec(), entry), true));
                        }
                        Err(e) => {
                            self.abandon(key, &entry);

                            return Err(e);
                        }
                    }
                }
                Found::Existing(entry) => {
                    let Some(mut guard) = self.settle(&entry) else {
                        continue;
                    };

                    match guard.state {
                        EntryState::Present(_) => {
                            guard.refcount += 1;
                            guard.evict_after = Instant::now() + self.inner.ttl;
                            let refcount = guard.refcount;
                            drop(guard);

                            self.check_consumers(refcount);

                            return Ok((CachedObject::new(self.inner.clone(), key.to_vec(), entry), false));
                        }
                        EntryState::Absent => {
                            // The key was just deleted; the entry is still in
                            // the map, so it can be repopulated in place.
                            self.inner
                                .backend
                                .insert(&self.inner.storage_key(key), &object.to_bytes())?;

                            guard.state = EntryState::Present(object);
                            guard.refcount += 1;
                            guard.evict_after = Instant::now() + self.inner.ttl;
                            drop(guard);

                            return Ok((CachedObject::new(self.inner.clone(), key.to_vec(), entry), true));
                        }
                        _ => unreachable!("entry settled into an unsettled state"),
                    }
                }
            }
        }
    }

    /// Loads the object of a key, materializing it from the factory when it
    /// exists in neither cache nor store.
    pub fn compute_if_absent(
        &self,
        key: &[u8],
        factory: impl FnOnce(&[u8]) -> O,
    ) -> Result<CachedObject<B, O>, Error> {
        if let Some(cached) = self.load(key)? {
            return Ok(cached);
        }

        let (cached, _) = self.store_if_absent(key, factory(key))?;

        Ok(cached)
    }

    /// Returns whether a key is present, answering from the cache when possible.
    pub fn contains(&self, key: &[u8]) -> Result<bool, Error> {
        if let Some(entry) = self.inner.entries.lock().get(key).cloned() {
            match entry.inner.lock().state {
                EntryState::Present(_) => return Ok(true),
                EntryState::Absent => return Ok(false),
                _ => {}
            }
        }

        Ok(self.inner.backend.exists(&self.inner.storage_key(key))?)
    }

    /// Deletes a key from cache and store. Live handles observe the entry as
    /// absent from this point on.
    pub fn delete(&self, key: &[u8]) -> Result<(), Error> {
        loop {
            let entry = self.inner.entries.lock().get(key).cloned();

            let Some(entry) = entry else {
                self.inner.backend.delete(&self.inner.storage_key(key))?;
                return Ok(());
            };

            let Some(mut guard) = self.settle(&entry) else {
                continue;
            };

            guard.state = EntryState::Absent;
            guard.dirty = false;
            drop(guard);

            self.inner.backend.delete(&self.inner.storage_key(key))?;
            return Ok(());
        }
    }

    /// Persists every dirty entry that has no live consumers and clears it,
    /// drops consumer-free entries whose cache time has passed, then flushes
    /// the backend.
    pub fn flush(&self) -> Result<(), Error> {
        self.sweep(false)?;
        self.inner.backend.flush()?;

        Ok(())
    }

    /// Persists every dirty entry regardless of consumers and clears the
    /// cache; only used once all workers have stopped.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.sweep(true)?;
        self.inner.backend.flush()?;

        Ok(())
    }

    fn sweep(&self, force: bool) -> Result<(), Error> {
        let snapshot: Vec<(Vec<u8>, Arc<Entry<O>>)> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        for (key, entry) in snapshot {
            let evict = {
                let mut guard = entry.inner.lock();

                if !force && guard.refcount > 0 {
                    continue;
                }

                let was_dirty = guard.dirty;

                if guard.dirty {
                    if let EntryState::Present(object) = &guard.state {
                        let bytes = object.to_bytes();
                        self.inner.backend.insert(&self.inner.storage_key(&key), &bytes)?;
                    }
                    guard.dirty = false;
                }

                // Persisted entries are cleared; clean ones stay warm until
                // their cache time has passed.
                force || was_dirty || Instant::now() >= guard.evict_after
            };

            if evict {
                let mut entries = self.inner.entries.lock();
                let mut guard = entry.inner.lock();

                if (force || guard.refcount == 0)
                    && entries.get(&key).map_or(false, |e| Arc::ptr_eq(e, &entry))
                {
                    entries.remove(&key);
                    guard.state = EntryState::Evicted;
                }
            }
        }

        Ok(())
    }

    /// Calls `f` with every persisted key under the namespace prefix, without
    /// the prefix byte, until it returns `false`.
    ///
    /// Iteration reads the backend; call [`Self::flush`] first when cached
    /// writes must be visible.
    pub fn for_each_key(&self, f: &mut dyn FnMut(&[u8]) -> bool) -> Result<(), Error> {
        self.inner
            .backend
            .iter_prefix(&[self.inner.prefix], &mut |key, _| f(&key[1..]))?;

        Ok(())
    }

    /// Like [`Self::for_each_key`], but restricted to keys starting with
    /// `sub_prefix`.
    pub fn for_each_key_with_prefix(&self, sub_prefix: &[u8], f: &mut dyn FnMut(&[u8]) -> bool) -> Result<(), Error> {
        let mut prefix = Vec::with_capacity(1 + sub_prefix.len());
        prefix.push(self.inner.prefix);
        prefix.extend_from_slice(sub_prefix);

        self.inner.backend.iter_prefix(&prefix, &mut |key, _| f(&key[1..]))?;

        Ok(())
    }

    /// Number of entries currently held in memory.
    pub fn cached_len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    fn check_consumers(&self, refcount: u32) {
        if let Some(leak_detection) = &self.inner.leak_detection {
            if refcount > leak_detection.max_consumers_per_object {
                log::warn!(
                    "Object storage {} has {} simultaneous consumers of one object.",
                    std::any::type_name::<O>(),
                    refcount
                );
            }
        }
    }
}
