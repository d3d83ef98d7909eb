// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

/// Builder for a [`MemoryConfig`].
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigBuilder;

impl MemoryConfigBuilder {
    /// Creates a new `MemoryConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finishes the builder into a [`MemoryConfig`].
    pub fn finish(self) -> MemoryConfig {
        MemoryConfig {}
    }
}

/// Configuration of the in-memory backend. There is nothing to configure.
#[derive(Clone, Debug, Default)]
pub struct MemoryConfig {}
