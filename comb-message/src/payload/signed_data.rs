// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packable::{byte_array_len, read_byte_array, uvarint_len, write_byte_array, write_uvarint, Packable, Read, Write},
    payload::read_and_check_payload_type,
    Error,
};

/// The payload type of signed data.
pub const SIGNED_DATA_PAYLOAD_TYPE: u64 = 3;

/// Arbitrary bytes signed with an Ed25519 key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedDataPayload {
    data: Vec<u8>,
    public_key: [u8; 32],
    signature: [u8; 64],
}

impl SignedDataPayload {
    /// Creates a new `SignedDataPayload`.
    pub fn new(data: Vec<u8>, public_key: [u8; 32], signature: [u8; 64]) -> Self {
        Self {
            data,
            public_key,
            signature,
        }
    }

    /// Returns the data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the Ed25519 public key of the signer.
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Returns the Ed25519 signature over the data bytes.
    pub fn signature(&self) -> &[u8; 64] {
        &self.signature
    }
}

impl Packable for SignedDataPayload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(SIGNED_DATA_PAYLOAD_TYPE) + byte_array_len(&self.data) + 32 + 64
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, SIGNED_DATA_PAYLOAD_TYPE)?;
        write_byte_array(writer, &self.data)?;
        self.public_key.pack(writer)?;
        self.signature.pack(writer)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        read_and_check_payload_type(reader, SIGNED_DATA_PAYLOAD_TYPE)?;

        let data = read_byte_array(reader)?;
        let public_key = <[u8; 32]>::unpack(reader)?;
        let signature = <[u8; 64]>::unpack(reader)?;

        Ok(Self {
            data,
            public_key,
            signature,
        })
    }
}
