// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{
    packable::{Packable, Read, Write},
    MessageId,
};

use crate::MilestoneIndex;

/// The singleton record anchoring the node's history: the indexes of the last
/// local snapshot and pruning run, and the solid entry points of the
/// snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SnapshotInfo {
    snapshot_index: MilestoneIndex,
    pruning_index: MilestoneIndex,
    timestamp: u64,
    entry_points: Vec<(MessageId, MilestoneIndex)>,
}

impl SnapshotInfo {
    /// Creates a new `SnapshotInfo`.
    pub fn new(
        snapshot_index: MilestoneIndex,
        pruning_index: MilestoneIndex,
        timestamp: u64,
        entry_points: Vec<(MessageId, MilestoneIndex)>,
    ) -> Self {
        Self {
            snapshot_index,
            pruning_index,
            timestamp,
            entry_points,
        }
    }

    /// Returns the milestone index of the snapshot.
    pub fn snapshot_index(&self) -> MilestoneIndex {
        self.snapshot_index
    }

    /// Returns the milestone index of the last pruning run.
    pub fn pruning_index(&self) -> MilestoneIndex {
        self.pruning_index
    }

    /// Returns the creation timestamp of the snapshot, seconds since the unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the solid entry points of the snapshot.
    pub fn entry_points(&self) -> &[(MessageId, MilestoneIndex)] {
        &self.entry_points
    }
}

impl Packable for SnapshotInfo {
    type Error = comb_message::Error;

    fn packed_len(&self) -> usize {
        4 + 4 + 8 + 4 + self.entry_points.len() * (32 + 4)
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.snapshot_index.0.pack(writer)?;
        self.pruning_index.0.pack(writer)?;
        self.timestamp.pack(writer)?;
        (self.entry_points.len() as u32).pack(writer)?;

        for (message_id, index) in &self.entry_points {
            message_id.pack(writer)?;
            index.0.pack(writer)?;
        }

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let snapshot_index = MilestoneIndex(u32::unpack(reader)?);
        let pruning_index = MilestoneIndex(u32::unpack(reader)?);
        let timestamp = u64::unpack(reader)?;

        let count = u32::unpack(reader)?;
        let mut entry_points = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let message_id = MessageId::unpack(reader)?;
            let index = MilestoneIndex(u32::unpack(reader)?);
            entry_points.push((message_id, index));
        }

        Ok(Self {
            snapshot_index,
            pruning_index,
            timestamp,
            entry_points,
        })
    }
}
