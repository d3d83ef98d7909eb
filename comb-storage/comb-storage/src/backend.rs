// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::Error;

/// A write batch, applied atomically where the backend supports it.
#[derive(Debug, Default)]
pub struct Batch {
    pub(crate) ops: Vec<BatchOp>,
}

/// A single operation of a [`Batch`].
#[derive(Debug)]
pub enum BatchOp {
    /// Insert or overwrite a key.
    Insert(Vec<u8>, Vec<u8>),
    /// Delete a key.
    Delete(Vec<u8>),
}

impl Batch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an insert.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Insert(key, value));
    }

    /// Queues a deletion.
    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete(key));
    }

    /// Returns the queued operations, consuming the batch.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    /// Returns whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// An ordered byte-key/byte-value store.
///
/// Keys compare lexicographically; iteration over a prefix is
/// snapshot-consistent with respect to the moment it begins.
pub trait StorageBackend: Clone + Send + Sync + 'static {
    /// Backend-specific configuration.
    type Config: Clone + Send + Sync;

    /// Opens the backend.
    fn start(config: Self::Config) -> Result<Self, Error>
    where
        Self: Sized;

    /// Flushes and closes the backend.
    fn shutdown(&self) -> Result<(), Error>;

    /// Fetches the value of a key, if present.
    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Returns whether a key is present.
    fn exists(&self, key: &[u8]) -> Result<bool, Error> {
        Ok(self.fetch(key)?.is_some())
    }

    /// Inserts or overwrites a key.
    fn insert(&self, key: &[u8], value: &[u8]) -> Result<(), Error>;

    /// Deletes a key; deleting an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), Error>;

    /// Applies a batch of writes.
    fn batch_apply(&self, batch: Batch) -> Result<(), Error>;

    /// Calls `f` for every `(key, value)` pair under the prefix, in key
    /// order, until the iteration ends or `f` returns `false`.
    fn iter_prefix(&self, prefix: &[u8], f: &mut dyn FnMut(&[u8], &[u8]) -> bool) -> Result<(), Error>;

    /// Persists all outstanding writes.
    fn flush(&self) -> Result<(), Error>;
}
