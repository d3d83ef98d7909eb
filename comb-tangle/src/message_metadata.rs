// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use bitflags::bitflags;
use comb_message::packable::{Packable, Read, Write};

use crate::MilestoneIndex;

bitflags! {
    /// Flag bits of a [`MessageMetadata`] record.
    pub struct MetadataFlags: u8 {
        /// Both parents of the message are solid or below the snapshot.
        const SOLID = 0b0000_0001;
        /// The message arrived as the answer to a request.
        const REQUESTED = 0b0000_0010;
        /// The message was first seen while the node was not yet synced.
        const SEEN_UNSYNCED = 0b0000_0100;
        /// The message was confirmed by a milestone.
        const CONFIRMED = 0b0000_1000;
    }
}

/// The mutable sidecar of a message, keyed by the message id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MessageMetadata {
    flags: MetadataFlags,
    confirmed: MilestoneIndex,
    received_at: u64,
}

impl MessageMetadata {
    /// Creates the metadata of a freshly received message.
    pub fn new(received_at: u64, requested: bool, seen_unsynced: bool) -> Self {
        let mut flags = MetadataFlags::empty();
        flags.set(MetadataFlags::REQUESTED, requested);
        flags.set(MetadataFlags::SEEN_UNSYNCED, seen_unsynced);

        Self {
            flags,
            confirmed: MilestoneIndex(0),
            received_at,
        }
    }

    /// Returns the flags of the metadata.
    pub fn flags(&self) -> MetadataFlags {
        self.flags
    }

    /// Returns whether the message is solid.
    pub fn is_solid(&self) -> bool {
        self.flags.contains(MetadataFlags::SOLID)
    }

    /// Marks the message as solid.
    pub fn mark_solid(&mut self) {
        self.flags.insert(MetadataFlags::SOLID);
    }

    /// Returns the milestone index that confirmed the message, if any.
    pub fn confirmed(&self) -> Option<MilestoneIndex> {
        self.flags.contains(MetadataFlags::CONFIRMED).then_some(self.confirmed)
    }

    /// Records the milestone index that confirmed the message.
    pub fn confirm(&mut self, index: MilestoneIndex) {
        self.flags.insert(MetadataFlags::CONFIRMED);
        self.confirmed = index;
    }

    /// Returns whether the message arrived as the answer to a request.
    pub fn is_requested(&self) -> bool {
        self.flags.contains(MetadataFlags::REQUESTED)
    }

    /// Returns the receive timestamp, seconds since the unix epoch.
    pub fn received_at(&self) -> u64 {
        self.received_at
    }
}

impl Packable for MessageMetadata {
    type Error = comb_message::Error;

    fn packed_len(&self) -> usize {
        1 + 4 + 8
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.flags.bits().pack(writer)?;
        self.confirmed.0.pack(writer)?;
        self.received_at.pack(writer)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let flags = MetadataFlags::from_bits_truncate(u8::unpack(reader)?);
        let confirmed = MilestoneIndex(u32::unpack(reader)?);
        let received_at = u64::unpack(reader)?;

        Ok(Self {
            flags,
            confirmed,
            received_at,
        })
    }
}
