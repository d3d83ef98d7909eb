// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packable::{uvarint_len, write_uvarint, Packable, Read, Write},
    payload::read_and_check_payload_type,
    Error,
};

/// The payload type of an indexation.
pub const INDEXATION_PAYLOAD_TYPE: u64 = 4;
/// The length of an indexation tag.
pub const INDEXATION_TAG_LENGTH: usize = 16;

/// A tag attached to a message for index-based lookups.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexationPayload {
    tag: [u8; INDEXATION_TAG_LENGTH],
}

impl IndexationPayload {
    /// Creates a new `IndexationPayload`.
    pub fn new(tag: [u8; INDEXATION_TAG_LENGTH]) -> Self {
        Self { tag }
    }

    /// Returns the tag.
    pub fn tag(&self) -> &[u8; INDEXATION_TAG_LENGTH] {
        &self.tag
    }
}

impl Packable for IndexationPayload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(INDEXATION_PAYLOAD_TYPE) + INDEXATION_TAG_LENGTH
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, INDEXATION_PAYLOAD_TYPE)?;
        self.tag.pack(writer)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        read_and_check_payload_type(reader, INDEXATION_PAYLOAD_TYPE)?;

        Ok(Self {
            tag: <[u8; INDEXATION_TAG_LENGTH]>::unpack(reader)?,
        })
    }
}
