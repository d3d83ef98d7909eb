// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CACHE_TIME_MS: u64 = 30_000;
const DEFAULT_MILESTONE_CACHE_TIME_MS: u64 = 150_000;
const DEFAULT_MAX_CONSUMERS_PER_OBJECT: u32 = 20;
const DEFAULT_MAX_CONSUMER_HOLD_TIME_SEC: u64 = 100;

/// Builder for [`LeakDetectionOptions`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeakDetectionOptionsBuilder {
    enabled: Option<bool>,
    max_consumers_per_object: Option<u32>,
    max_consumer_hold_time_sec: Option<u64>,
}

impl LeakDetectionOptionsBuilder {
    /// Finishes the builder; `None` when leak detection is disabled.
    pub fn finish(self) -> Option<LeakDetectionOptions> {
        if !self.enabled.unwrap_or(false) {
            return None;
        }

        Some(LeakDetectionOptions {
            max_consumers_per_object: self
                .max_consumers_per_object
                .unwrap_or(DEFAULT_MAX_CONSUMERS_PER_OBJECT),
            max_consumer_hold_time: Duration::from_secs(
                self.max_consumer_hold_time_sec.unwrap_or(DEFAULT_MAX_CONSUMER_HOLD_TIME_SEC),
            ),
        })
    }
}

/// Limits beyond which a cache consumer is reported as a probable leak.
#[derive(Clone, Copy, Debug)]
pub struct LeakDetectionOptions {
    /// Number of simultaneous consumers above which a report is emitted.
    pub max_consumers_per_object: u32,
    /// Hold time above which a handle is reported on release.
    pub max_consumer_hold_time: Duration,
}

/// Builder for [`CacheOptions`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheOptionsBuilder {
    cache_time_ms: Option<u64>,
    #[serde(default)]
    leak_detection: LeakDetectionOptionsBuilder,
}

impl CacheOptionsBuilder {
    fn finish_with_default(self, default_cache_time_ms: u64) -> CacheOptions {
        CacheOptions {
            cache_time: Duration::from_millis(self.cache_time_ms.unwrap_or(default_cache_time_ms)),
            leak_detection: self.leak_detection.finish(),
        }
    }
}

/// Cache behavior of a single entity store.
#[derive(Clone, Debug)]
pub struct CacheOptions {
    /// How long an unreferenced entry stays warm after its last access.
    pub cache_time: Duration,
    /// Optional leak detection limits.
    pub leak_detection: Option<LeakDetectionOptions>,
}

/// Builder for a [`TangleConfig`], deserialized from the `caches` section of
/// the node configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TangleConfigBuilder {
    #[serde(default)]
    messages: CacheOptionsBuilder,
    #[serde(default)]
    metadata: CacheOptionsBuilder,
    #[serde(default)]
    children: CacheOptionsBuilder,
    #[serde(default)]
    milestones: CacheOptionsBuilder,
    #[serde(default)]
    unconfirmed_messages: CacheOptionsBuilder,
}

impl TangleConfigBuilder {
    /// Creates a new `TangleConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finishes the builder into a [`TangleConfig`].
    pub fn finish(self) -> TangleConfig {
        TangleConfig {
            messages: self.messages.finish_with_default(DEFAULT_CACHE_TIME_MS),
            metadata: self.metadata.finish_with_default(DEFAULT_CACHE_TIME_MS),
            children: self.children.finish_with_default(DEFAULT_CACHE_TIME_MS),
            milestones: self.milestones.finish_with_default(DEFAULT_MILESTONE_CACHE_TIME_MS),
            unconfirmed_messages: self.unconfirmed_messages.finish_with_default(DEFAULT_CACHE_TIME_MS),
        }
    }
}

/// Per-entity cache configuration of the tangle.
#[derive(Clone, Debug)]
pub struct TangleConfig {
    /// Cache options of the message store.
    pub messages: CacheOptions,
    /// Cache options of the metadata store.
    pub metadata: CacheOptions,
    /// Cache options of the child-edge store.
    pub children: CacheOptions,
    /// Cache options of the milestone store.
    pub milestones: CacheOptions,
    /// Cache options of the unconfirmed-message store.
    pub unconfirmed_messages: CacheOptions,
}

impl Default for TangleConfig {
    fn default() -> Self {
        TangleConfigBuilder::default().finish()
    }
}
