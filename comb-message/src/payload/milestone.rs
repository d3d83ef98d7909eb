// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packable::{read_uvarint_in_range, uvarint_len, write_uvarint, Packable, Read, Write},
    payload::read_and_check_payload_type,
    Error,
};

/// The payload type of a milestone.
pub const MILESTONE_PAYLOAD_TYPE: u64 = 1;
/// The length of the merkle proof over the confirmed past cone.
pub const MILESTONE_MERKLE_PROOF_LENGTH: usize = 64;
/// The length of the coordinator signature.
pub const MILESTONE_SIGNATURE_LENGTH: usize = 64;

/// A signed checkpoint issued by the coordinator, confirming its past cone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MilestonePayload {
    index: u32,
    timestamp: u64,
    merkle_proof: [u8; MILESTONE_MERKLE_PROOF_LENGTH],
    signature: [u8; MILESTONE_SIGNATURE_LENGTH],
}

impl MilestonePayload {
    /// Creates a new `MilestonePayload`.
    pub fn new(
        index: u32,
        timestamp: u64,
        merkle_proof: [u8; MILESTONE_MERKLE_PROOF_LENGTH],
        signature: [u8; MILESTONE_SIGNATURE_LENGTH],
    ) -> Self {
        Self {
            index,
            timestamp,
            merkle_proof,
            signature,
        }
    }

    /// Returns the milestone index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the issuance timestamp, seconds since the unix epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the merkle proof over the confirmed past cone.
    pub fn merkle_proof(&self) -> &[u8; MILESTONE_MERKLE_PROOF_LENGTH] {
        &self.merkle_proof
    }

    /// Returns the coordinator signature.
    pub fn signature(&self) -> &[u8; MILESTONE_SIGNATURE_LENGTH] {
        &self.signature
    }

    /// Returns the bytes the coordinator signature is computed over: the
    /// index, timestamp and merkle proof in their wire encoding.
    pub fn essence(&self) -> Vec<u8> {
        let mut essence = Vec::with_capacity(uvarint_len(self.index as u64) + 8 + MILESTONE_MERKLE_PROOF_LENGTH);

        // Writing to a vector cannot fail.
        write_uvarint(&mut essence, self.index as u64).unwrap();
        essence.extend_from_slice(&self.timestamp.to_le_bytes());
        essence.extend_from_slice(&self.merkle_proof);

        essence
    }
}

impl Packable for MilestonePayload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(MILESTONE_PAYLOAD_TYPE)
            + uvarint_len(self.index as u64)
            + self.timestamp.packed_len()
            + MILESTONE_MERKLE_PROOF_LENGTH
            + MILESTONE_SIGNATURE_LENGTH
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, MILESTONE_PAYLOAD_TYPE)?;
        write_uvarint(writer, self.index as u64)?;
        self.timestamp.pack(writer)?;
        self.merkle_proof.pack(writer)?;
        self.signature.pack(writer)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        read_and_check_payload_type(reader, MILESTONE_PAYLOAD_TYPE)?;

        let index = read_uvarint_in_range(reader, u32::MAX as u64)? as u32;
        let timestamp = u64::unpack(reader)?;
        let merkle_proof = <[u8; MILESTONE_MERKLE_PROOF_LENGTH]>::unpack(reader)?;
        let signature = <[u8; MILESTONE_SIGNATURE_LENGTH]>::unpack(reader)?;

        Ok(Self {
            index,
            timestamp,
            merkle_proof,
            signature,
        })
    }
}
