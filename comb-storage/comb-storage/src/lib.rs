// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! A key-value storage abstraction for the comb node.
//!
//! All entity stores share one ordered byte keyspace, namespaced by a leading
//! prefix byte. Backends only need to provide the operations of
//! [`backend::StorageBackend`]; everything type-aware lives above this crate.

#![warn(missing_docs)]

/// A module that provides the backend trait and write batches.
pub mod backend;
/// A module that provides the persisted storage health flag.
pub mod health;
/// A module that provides the system namespace layout.
pub mod system;

use thiserror::Error;

/// Error occurring when accessing the storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An error of the concrete backend.
    #[error("storage backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
    /// An unknown storage health variant was read back from the store.
    #[error("unknown storage health variant: {0}")]
    UnknownHealth(u8),
}
