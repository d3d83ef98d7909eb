// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! An in-memory `comb-storage` backend, for tests and volatile runs.

#![warn(missing_docs)]

/// A module that provides the backend configuration.
pub mod config;
/// A module that provides the backend implementation.
pub mod storage;

pub use self::{
    config::{MemoryConfig, MemoryConfigBuilder},
    storage::Storage,
};
