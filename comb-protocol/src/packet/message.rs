// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::ops::RangeInclusive;

use crate::packet::Packet;

// A message needs at least a version, two parents, a payload length and a
// nonce; anything below that is noise.
const MESSAGE_LENGTH_MIN: usize = 1 + 32 + 32 + 1 + 8;

/// A packet carrying the raw bytes of one message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessagePacket {
    /// The undecoded message bytes.
    pub bytes: Vec<u8>,
}

impl MessagePacket {
    /// Creates a new `MessagePacket`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl Packet for MessagePacket {
    const ID: u8 = 2;

    fn size_range() -> RangeInclusive<usize> {
        MESSAGE_LENGTH_MIN..=u16::MAX as usize
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn write_bytes(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.bytes);
    }
}
