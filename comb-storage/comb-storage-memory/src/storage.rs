// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, sync::Arc};

use comb_storage::{
    backend::{Batch, BatchOp, StorageBackend},
    Error,
};
use parking_lot::RwLock;

use crate::config::MemoryConfig;

/// An in-memory storage backend over a `BTreeMap`.
#[derive(Clone, Default)]
pub struct Storage {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl Storage {
    /// Creates an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for Storage {
    type Config = MemoryConfig;

    fn start(_config: Self::Config) -> Result<Self, Error> {
        Ok(Self::new())
    }

    fn shutdown(&self) -> Result<(), Error> {
        Ok(())
    }

    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, Error> {
        Ok(self.inner.read().contains_key(key))
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.inner.write().insert(key.to_vec(), value.to_vec());

        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), Error> {
        self.inner.write().remove(key);

        Ok(())
    }

    fn batch_apply(&self, batch: Batch) -> Result<(), Error> {
        let mut inner = self.inner.write();

        for op in batch.into_ops() {
            match op {
                BatchOp::Insert(key, value) => {
                    inner.insert(key, value);
                }
                BatchOp::Delete(key) => {
                    inner.remove(&key);
                }
            }
        }

        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8], f: &mut dyn FnMut(&[u8], &[u8]) -> bool) -> Result<(), Error> {
        // Clone the matching range so the iteration sees a snapshot and the
        // callback is free to mutate the storage.
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self
            .inner
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, value) in snapshot {
            if !f(&key, &value) {
                break;
            }
        }

        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
