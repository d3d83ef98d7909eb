// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use comb_storage::backend::StorageBackend;
use comb_storage_memory::{MemoryConfigBuilder, Storage};
use comb_tangle::{
    config::{CacheOptions, LeakDetectionOptions},
    object_storage::{ObjectStorage, StorableObject},
    Error,
};

#[derive(Clone, Debug, Eq, PartialEq)]
struct Counter {
    value: u32,
}

impl StorableObject for Counter {
    fn from_bytes(_key: &[u8], bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            value: u32::from_le_bytes(bytes.try_into().map_err(|_| Error::MalformedRecord)?),
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.value.to_le_bytes().to_vec()
    }
}

fn options(cache_time: Duration) -> CacheOptions {
    CacheOptions {
        cache_time,
        leak_detection: None,
    }
}

fn backend() -> Storage {
    Storage::start(MemoryConfigBuilder::new().finish()).unwrap()
}

#[test]
fn load_miss_returns_none() {
    let storage = ObjectStorage::<_, Counter>::new(backend(), 9, &options(Duration::from_secs(10)));

    assert!(storage.load(b"missing").unwrap().is_none());
    assert!(!storage.contains(b"missing").unwrap());
}

#[test]
fn store_and_reload_share_one_instance() {
    let storage = ObjectStorage::new(backend(), 9, &options(Duration::from_secs(10)));

    let (first, newly) = storage.store_if_absent(b"key", Counter { value: 1 }).unwrap();
    assert!(newly);

    let second = storage.load(b"key").unwrap().unwrap();

    // Both handles point at the same materialized object.
    let first_ptr = first.map(|c| c as *const Counter as usize).unwrap();
    let second_ptr = second.map(|c| c as *const Counter as usize).unwrap();
    assert_eq!(first_ptr, second_ptr);

    // A mutation through one handle is visible through the other.
    first.mutate(|c| c.value = 7);
    assert_eq!(second.map(|c| c.value), Some(7));
}

#[test]
fn eviction_after_cache_time_persists_dirty_state() {
    let storage = ObjectStorage::new(backend(), 9, &options(Duration::ZERO));

    let (cached, _) = storage.store_if_absent(b"key", Counter { value: 1 }).unwrap();
    cached.mutate(|c| c.value = 2);
    drop(cached);

    // The cache time is zero, so the entry was evicted on release.
    assert_eq!(storage.cached_len(), 0);

    // The next load rematerializes from the backend, with the mutation.
    let reloaded = storage.load(b"key").unwrap().unwrap();
    assert_eq!(reloaded.map(|c| c.value), Some(2));
}

#[test]
fn release_before_cache_time_keeps_entry_warm() {
    let storage = ObjectStorage::new(backend(), 9, &options(Duration::from_secs(60)));

    let (cached, _) = storage.store_if_absent(b"key", Counter { value: 1 }).unwrap();
    drop(cached);

    assert_eq!(storage.cached_len(), 1);

    // A forced release evicts regardless of the cache time.
    let cached = storage.load(b"key").unwrap().unwrap();
    cached.release(true);

    assert_eq!(storage.cached_len(), 0);
}

#[test]
fn concurrent_store_if_absent_materializes_once() {
    let storage = std::sync::Arc::new(ObjectStorage::new(backend(), 9, &options(Duration::from_secs(10))));

    let results: Vec<(usize, bool)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8u32)
            .map(|i| {
                let storage = storage.clone();
                scope.spawn(move || {
                    let (cached, newly) = storage.store_if_absent(b"key", Counter { value: i }).unwrap();
                    (cached.map(|c| c as *const Counter as usize).unwrap(), newly)
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    // Exactly one contender created the object.
    assert_eq!(results.iter().filter(|(_, newly)| *newly).count(), 1);

    // Every contender observed the same instance.
    let first_ptr = results[0].0;
    assert!(results.iter().all(|(ptr, _)| *ptr == first_ptr));
}

#[test]
fn delete_turns_live_handles_absent() {
    let storage = ObjectStorage::new(backend(), 9, &options(Duration::from_secs(10)));

    let (cached, _) = storage.store_if_absent(b"key", Counter { value: 1 }).unwrap();
    assert!(cached.exists());

    storage.delete(b"key").unwrap();

    assert!(!cached.exists());
    assert_eq!(cached.map(|c| c.value), None);
    assert!(!storage.contains(b"key").unwrap());
    assert!(storage.load(b"key").unwrap().is_none());
}

#[test]
fn flush_persists_dirty_unreferenced_entries() {
    let backend = backend();
    let storage = ObjectStorage::new(backend.clone(), 9, &options(Duration::from_secs(60)));

    let (cached, _) = storage.store_if_absent(b"key", Counter { value: 1 }).unwrap();
    cached.mutate(|c| c.value = 5);
    drop(cached);

    // Still warm, still dirty in cache; the backend holds the initial value.
    assert_eq!(
        backend.fetch(&[9u8, b'k', b'e', b'y']).unwrap().unwrap(),
        1u32.to_le_bytes().to_vec()
    );

    storage.flush().unwrap();

    assert_eq!(
        backend.fetch(&[9u8, b'k', b'e', b'y']).unwrap().unwrap(),
        5u32.to_le_bytes().to_vec()
    );
}

#[test]
fn compute_if_absent_uses_factory_on_miss() {
    let storage = ObjectStorage::new(backend(), 9, &options(Duration::from_secs(10)));

    let cached = storage.compute_if_absent(b"key", |_| Counter { value: 3 }).unwrap();
    assert_eq!(cached.map(|c| c.value), Some(3));
    drop(cached);

    // The factory result was persisted; a second compute loads it instead.
    let cached = storage.compute_if_absent(b"key", |_| Counter { value: 9 }).unwrap();
    assert_eq!(cached.map(|c| c.value), Some(3));
}

#[test]
fn leak_detection_does_not_disturb_operation() {
    let storage = ObjectStorage::new(
        backend(),
        9,
        &CacheOptions {
            cache_time: Duration::from_secs(10),
            leak_detection: Some(LeakDetectionOptions {
                max_consumers_per_object: 1,
                max_consumer_hold_time: Duration::ZERO,
            }),
        },
    );

    let (first, _) = storage.store_if_absent(b"key", Counter { value: 1 }).unwrap();
    let second = storage.load(b"key").unwrap().unwrap();

    drop(second);
    drop(first);

    assert!(storage.load(b"key").unwrap().is_some());
}
