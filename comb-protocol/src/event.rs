// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The events published by the protocol workers on the node bus.
//!
//! Listeners must not block; anything expensive belongs behind a queue.

use comb_message::MessageId;
use comb_tangle::MilestoneIndex;

use crate::peer::PeerId;

/// A message was seen for the first time and stored.
pub struct NewMessage {
    /// The id of the message.
    pub message_id: MessageId,
    /// The raw bytes of the message, for forwarding.
    pub bytes: Vec<u8>,
    /// The peer the message arrived from, if any.
    pub from: Option<PeerId>,
}

/// An already stored message was received again.
pub struct KnownMessage {
    /// The id of the message.
    pub message_id: MessageId,
}

/// A milestone payload failed validation.
pub struct InvalidMilestone {
    /// The id of the carrying message.
    pub message_id: MessageId,
}

/// The latest known milestone index moved forward.
pub struct LatestMilestoneChanged {
    /// The new latest milestone index.
    pub index: MilestoneIndex,
}

/// A message became solid.
pub struct MessageSolidified {
    /// The id of the message.
    pub message_id: MessageId,
}

/// The latest solid milestone index moved forward.
pub struct SolidMilestoneAdvanced {
    /// The new solid milestone index.
    pub index: MilestoneIndex,
}
