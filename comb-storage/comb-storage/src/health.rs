// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::{
    backend::StorageBackend,
    system::{PREFIX_SYSTEM, SYSTEM_KEY_HEALTH, SYSTEM_KEY_TAINTED},
    Error,
};

/// The persisted health of the storage.
///
/// The node sets the health to `Corrupted` while it runs and back to
/// `Healthy` on a clean shutdown; finding `Corrupted` on start is what arms
/// revalidation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum StorageHealth {
    /// The storage was closed cleanly.
    Healthy = 0,
    /// The storage was not closed cleanly and may hold partial writes.
    Corrupted = 1,
}

impl StorageHealth {
    /// Creates a `StorageHealth` from its persisted byte.
    pub fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Self::Healthy),
            1 => Ok(Self::Corrupted),
            b => Err(Error::UnknownHealth(b)),
        }
    }
}

fn health_key() -> [u8; 2] {
    [PREFIX_SYSTEM, SYSTEM_KEY_HEALTH]
}

fn tainted_key() -> [u8; 2] {
    [PREFIX_SYSTEM, SYSTEM_KEY_TAINTED]
}

/// Reads the persisted storage health; `None` on a fresh store.
pub fn fetch_health<B: StorageBackend>(backend: &B) -> Result<Option<StorageHealth>, Error> {
    match backend.fetch(&health_key())? {
        Some(bytes) if !bytes.is_empty() => Ok(Some(StorageHealth::from_byte(bytes[0])?)),
        Some(_) => Err(Error::UnknownHealth(u8::MAX)),
        None => Ok(None),
    }
}

/// Persists the storage health and flushes it to disk.
pub fn set_health<B: StorageBackend>(backend: &B, health: StorageHealth) -> Result<(), Error> {
    backend.insert(&health_key(), &[health as u8])?;
    backend.flush()
}

/// Returns whether the storage went through revalidation at least once.
///
/// The taint marker is permanent; anything signing milestones must refuse to
/// run against a tainted database.
pub fn is_tainted<B: StorageBackend>(backend: &B) -> Result<bool, Error> {
    backend.exists(&tainted_key())
}

/// Marks the storage as tainted, permanently, and flushes it to disk.
pub fn mark_tainted<B: StorageBackend>(backend: &B) -> Result<(), Error> {
    backend.insert(&tainted_key(), &[1u8])?;
    backend.flush()
}
