// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! A `comb-storage` backend over [sled](https://docs.rs/sled).

#![warn(missing_docs)]

/// A module that provides the backend configuration.
pub mod config;
/// A module that provides the backend implementation.
pub mod storage;

pub use self::{
    config::{SledConfig, SledConfigBuilder},
    storage::Storage,
};
