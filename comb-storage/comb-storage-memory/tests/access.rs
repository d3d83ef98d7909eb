// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_storage::{
    backend::{Batch, StorageBackend},
    health::{fetch_health, set_health, StorageHealth},
};
use comb_storage_memory::{MemoryConfigBuilder, Storage};

fn storage() -> Storage {
    Storage::start(MemoryConfigBuilder::new().finish()).unwrap()
}

#[test]
fn insert_fetch_delete() {
    let storage = storage();

    assert!(storage.fetch(b"\x01key").unwrap().is_none());
    assert!(!storage.exists(b"\x01key").unwrap());

    storage.insert(b"\x01key", b"value").unwrap();

    assert_eq!(storage.fetch(b"\x01key").unwrap().unwrap(), b"value");
    assert!(storage.exists(b"\x01key").unwrap());

    storage.delete(b"\x01key").unwrap();

    assert!(storage.fetch(b"\x01key").unwrap().is_none());
}

#[test]
fn batch_apply() {
    let storage = storage();
    storage.insert(b"\x01a", b"1").unwrap();

    let mut batch = Batch::new();
    batch.insert(b"\x01b".to_vec(), b"2".to_vec());
    batch.insert(b"\x01c".to_vec(), b"3".to_vec());
    batch.delete(b"\x01a".to_vec());

    storage.batch_apply(batch).unwrap();

    assert!(!storage.exists(b"\x01a").unwrap());
    assert!(storage.exists(b"\x01b").unwrap());
    assert!(storage.exists(b"\x01c").unwrap());
}

#[test]
fn prefix_iteration_is_ordered_and_scoped() {
    let storage = storage();

    storage.insert(b"\x01b", b"").unwrap();
    storage.insert(b"\x01a", b"").unwrap();
    storage.insert(b"\x02z", b"").unwrap();

    let mut keys = Vec::new();
    storage
        .iter_prefix(&[1u8], &mut |key, _| {
            keys.push(key.to_vec());
            true
        })
        .unwrap();

    assert_eq!(keys, vec![b"\x01a".to_vec(), b"\x01b".to_vec()]);
}

#[test]
fn prefix_iteration_aborts_early() {
    let storage = storage();

    for i in 0u8..10 {
        storage.insert(&[1u8, i], b"").unwrap();
    }

    let mut seen = 0;
    storage
        .iter_prefix(&[1u8], &mut |_, _| {
            seen += 1;
            seen < 3
        })
        .unwrap();

    assert_eq!(seen, 3);
}

#[test]
fn iteration_callback_may_mutate() {
    let storage = storage();

    for i in 0u8..5 {
        storage.insert(&[1u8, i], b"").unwrap();
    }

    storage
        .iter_prefix(&[1u8], &mut |key, _| {
            storage.delete(key).unwrap();
            true
        })
        .unwrap();

    let mut left = 0;
    storage.iter_prefix(&[1u8], &mut |_, _| {
        left += 1;
        true
    })
    .unwrap();

    assert_eq!(left, 0);
}

#[test]
fn health_round_trip() {
    let storage = storage();

    assert!(fetch_health(&storage).unwrap().is_none());

    set_health(&storage, StorageHealth::Corrupted).unwrap();
    assert_eq!(fetch_health(&storage).unwrap(), Some(StorageHealth::Corrupted));

    set_health(&storage, StorageHealth::Healthy).unwrap();
    assert_eq!(fetch_health(&storage).unwrap(), Some(StorageHealth::Healthy));
}
