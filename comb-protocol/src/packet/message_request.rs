// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::ops::RangeInclusive;

use comb_message::{MessageId, MESSAGE_ID_LENGTH};

use crate::packet::Packet;

/// A request for the message with a given id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageRequestPacket {
    /// The id of the requested message.
    pub message_id: MessageId,
}

impl MessageRequestPacket {
    /// Creates a new `MessageRequestPacket`.
    pub fn new(message_id: MessageId) -> Self {
        Self { message_id }
    }
}

impl Packet for MessageRequestPacket {
    const ID: u8 = 4;

    fn size_range() -> RangeInclusive<usize> {
        MESSAGE_ID_LENGTH..=MESSAGE_ID_LENGTH
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        // The length has been checked by the caller.
        Self {
            message_id: MessageId::new(bytes.try_into().unwrap()),
        }
    }

    fn size(&self) -> usize {
        MESSAGE_ID_LENGTH
    }

    fn write_bytes(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(self.message_id.as_ref());
    }
}
