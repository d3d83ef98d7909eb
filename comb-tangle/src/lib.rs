// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The tangle of the comb node: a refcounted, TTL-backed object cache over
//! the key-value storage, typed stores for every entity, and the `Tangle`
//! handle tying them together with the milestone state of the node.

/// A module that provides the per-entity cache configuration.
pub mod config;
/// A module that provides the refcounted object cache.
pub mod object_storage;
/// A module that provides the typed entity stores.
pub mod storage;

mod error;
mod message_metadata;
mod milestone_index;
mod snapshot_info;
mod tangle;

pub use self::{
    error::Error,
    message_metadata::{MessageMetadata, MetadataFlags},
    milestone_index::MilestoneIndex,
    snapshot_info::SnapshotInfo,
    tangle::Tangle,
};
