// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::ops::RangeInclusive;

use crate::packet::Packet;

const MILESTONE_REQUEST_LENGTH: usize = 4;

/// A request for the message referenced by a milestone index; index zero asks
/// for the latest known milestone.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MilestoneRequestPacket {
    /// The requested milestone index, big-endian on the wire.
    pub index: u32,
}

impl MilestoneRequestPacket {
    /// Creates a new `MilestoneRequestPacket`.
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl Packet for MilestoneRequestPacket {
    const ID: u8 = 3;

    fn size_range() -> RangeInclusive<usize> {
        MILESTONE_REQUEST_LENGTH..=MILESTONE_REQUEST_LENGTH
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            // The length has been checked by the caller.
            index: u32::from_be_bytes(bytes.try_into().unwrap()),
        }
    }

    fn size(&self) -> usize {
        MILESTONE_REQUEST_LENGTH
    }

    fn write_bytes(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.index.to_be_bytes());
    }
}
