// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crypto::hashes::{blake2b::Blake2b256, Digest};

use crate::{
    packable::{read_uvarint, uvarint_len, write_uvarint, Packable, Read, Write},
    payload::Payload,
    Error, MessageId,
};

/// The only message version this node understands.
pub const MESSAGE_VERSION: u64 = 1;

/// A vertex of the tangle, referencing two parent messages and carrying a payload.
///
/// Messages are immutable: they are created on first receipt and only ever
/// destroyed by pruning or revalidation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    parent1: MessageId,
    parent2: MessageId,
    payload: Payload,
    nonce: u64,
}

impl Message {
    /// Creates a new `Message`.
    pub fn new(parent1: MessageId, parent2: MessageId, payload: Payload, nonce: u64) -> Self {
        Self {
            parent1,
            parent2,
            payload,
            nonce,
        }
    }

    /// Computes the identifier of the message, the BLAKE2b-256 hash of its canonical encoding.
    pub fn id(&self) -> MessageId {
        // Packing into a vector cannot fail.
        let bytes = self.pack_new().expect("packing a message into a vector failed");

        MessageId::new(Blake2b256::digest(&bytes).into())
    }

    /// Returns the first parent of the message.
    pub fn parent1(&self) -> &MessageId {
        &self.parent1
    }

    /// Returns the second parent of the message.
    pub fn parent2(&self) -> &MessageId {
        &self.parent2
    }

    /// Returns both parents of the message.
    pub fn parents(&self) -> [MessageId; 2] {
        [self.parent1, self.parent2]
    }

    /// Returns the payload of the message.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the nonce of the message.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

impl Packable for Message {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(MESSAGE_VERSION)
            + self.parent1.packed_len()
            + self.parent2.packed_len()
            + self.payload.prefixed_len()
            + self.nonce.packed_len()
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, MESSAGE_VERSION)?;
        self.parent1.pack(writer)?;
        self.parent2.pack(writer)?;
        self.payload.write_prefixed(writer)?;
        self.nonce.pack(writer)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let version = read_uvarint(reader)?;

        if version != MESSAGE_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let parent1 = MessageId::unpack(reader)?;
        let parent2 = MessageId::unpack(reader)?;

        // A message is expected to carry a payload.
        let payload = Payload::read_prefixed(reader).map_err(|e| match e {
            Error::EmptyPayload => Error::InvalidPayloadLength,
            e => e,
        })?;

        let nonce = u64::unpack(reader)?;

        Ok(Self {
            parent1,
            parent2,
            payload,
            nonce,
        })
    }
}
