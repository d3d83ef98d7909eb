// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_PATH: &str = "./storage/database";
const DEFAULT_CACHE_CAPACITY: u64 = 1024 * 1024 * 64;

/// Builder for a [`SledConfig`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SledConfigBuilder {
    path: Option<PathBuf>,
    cache_capacity: Option<u64>,
}

impl SledConfigBuilder {
    /// Creates a new `SledConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database directory.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path.replace(path.into());
        self
    }

    /// Sets the page cache capacity, in bytes.
    pub fn with_cache_capacity(mut self, cache_capacity: u64) -> Self {
        self.cache_capacity.replace(cache_capacity);
        self
    }

    /// Finishes the builder into a [`SledConfig`].
    pub fn finish(self) -> SledConfig {
        SledConfig {
            path: self.path.unwrap_or_else(|| DEFAULT_PATH.into()),
            cache_capacity: self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        }
    }
}

/// Configuration of the sled backend.
#[derive(Clone, Debug)]
pub struct SledConfig {
    pub(crate) path: PathBuf,
    pub(crate) cache_capacity: u64,
}
