// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::{
    packable::{byte_array_len, read_byte_array, uvarint_len, write_byte_array, write_uvarint, Packable, Read, Write},
    payload::read_and_check_payload_type,
    Error,
};

/// The payload type of unsigned data.
pub const UNSIGNED_DATA_PAYLOAD_TYPE: u64 = 2;

/// Arbitrary bytes without a signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsignedDataPayload {
    data: Vec<u8>,
}

impl UnsignedDataPayload {
    /// Creates a new `UnsignedDataPayload`.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Returns the data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Packable for UnsignedDataPayload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(UNSIGNED_DATA_PAYLOAD_TYPE) + byte_array_len(&self.data)
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, UNSIGNED_DATA_PAYLOAD_TYPE)?;
        write_byte_array(writer, &self.data)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        read_and_check_payload_type(reader, UNSIGNED_DATA_PAYLOAD_TYPE)?;

        Ok(Self {
            data: read_byte_array(reader)?,
        })
    }
}
