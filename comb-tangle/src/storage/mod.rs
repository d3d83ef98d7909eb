// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Typed stores over the object cache, one per entity, each pinning its
//! namespace prefix and key encoding.

mod children;
mod messages;
mod metadata;
mod milestones;
mod unconfirmed;

pub use self::{
    children::{Child, ChildrenStore},
    messages::{CachedMessage, MessageStore},
    metadata::{CachedMetadata, MetadataStore},
    milestones::{CachedMilestone, MilestoneEntry, MilestoneStore},
    unconfirmed::{UnconfirmedMessage, UnconfirmedMessageStore},
};

/// Namespace prefix of the message store.
pub const PREFIX_MESSAGES: u8 = 1;
/// Namespace prefix of the metadata store.
pub const PREFIX_METADATA: u8 = 2;
/// Namespace prefix of the child-edge store.
pub const PREFIX_CHILDREN: u8 = 3;
/// Namespace prefix of the milestone store.
pub const PREFIX_MILESTONES: u8 = 4;
/// Namespace prefix of the unconfirmed-message store.
pub const PREFIX_UNCONFIRMED: u8 = 5;
