// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_storage::{
    backend::{Batch, BatchOp, StorageBackend},
    Error,
};

use crate::config::SledConfig;

fn backend_err(e: sled::Error) -> Error {
    Error::Backend(Box::new(e))
}

/// A storage backend over a sled database.
#[derive(Clone)]
pub struct Storage {
    inner: sled::Db,
}

impl StorageBackend for Storage {
    type Config = SledConfig;

    fn start(config: Self::Config) -> Result<Self, Error> {
        let inner = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .open()
            .map_err(backend_err)?;

        Ok(Self { inner })
    }

    fn shutdown(&self) -> Result<(), Error> {
        self.inner.flush().map_err(backend_err)?;

        Ok(())
    }

    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.inner.get(key).map_err(backend_err)?.map(|value| value.to_vec()))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, Error> {
        self.inner.contains_key(key).map_err(backend_err)
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.inner.insert(key, value).map_err(backend_err)?;

        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), Error> {
        self.inner.remove(key).map_err(backend_err)?;

        Ok(())
    }

    fn batch_apply(&self, batch: Batch) -> Result<(), Error> {
        let mut sled_batch = sled::Batch::default();

        for op in batch.into_ops() {
            match op {
                BatchOp::Insert(key, value) => sled_batch.insert(key, value),
                BatchOp::Delete(key) => sled_batch.remove(key),
            }
        }

        self.inner.apply_batch(sled_batch).map_err(backend_err)
    }

    fn iter_prefix(&self, prefix: &[u8], f: &mut dyn FnMut(&[u8], &[u8]) -> bool) -> Result<(), Error> {
        for entry in self.inner.scan_prefix(prefix) {
            let (key, value) = entry.map_err(backend_err)?;

            if !f(&key, &value) {
                break;
            }
        }

        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        self.inner.flush().map_err(backend_err)?;

        Ok(())
    }
}
