// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Payload types and their varint-based binary layouts.

mod indexation;
mod milestone;
mod signed_data;
mod transaction;
mod unsigned_data;

pub use self::{
    indexation::{IndexationPayload, INDEXATION_PAYLOAD_TYPE, INDEXATION_TAG_LENGTH},
    milestone::{MilestonePayload, MILESTONE_MERKLE_PROOF_LENGTH, MILESTONE_PAYLOAD_TYPE, MILESTONE_SIGNATURE_LENGTH},
    signed_data::{SignedDataPayload, SIGNED_DATA_PAYLOAD_TYPE},
    transaction::{
        SignedTransactionPayload, SigLockedSingleOutput, UnlockBlock, UnsignedTransaction, UtxoInput,
        TRANSACTION_PAYLOAD_TYPE,
    },
    unsigned_data::{UnsignedDataPayload, UNSIGNED_DATA_PAYLOAD_TYPE},
};

use crate::{
    packable::{read_uvarint, read_uvarint_in_range, uvarint_len, write_uvarint, Packable, Read, Write},
    Error,
};

/// Upper bound of the payload type varint.
pub const PAYLOAD_TYPE_MAX: u64 = 16383;

/// The payload of a message, dispatched on its leading type varint.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Payload {
    /// A signed value transaction.
    Transaction(Box<SignedTransactionPayload>),
    /// A signed checkpoint confirming its past cone.
    Milestone(Box<MilestonePayload>),
    /// Arbitrary bytes without a signature.
    UnsignedData(UnsignedDataPayload),
    /// Arbitrary bytes with an Ed25519 signature.
    SignedData(SignedDataPayload),
    /// A tag for message lookups.
    Indexation(IndexationPayload),
    /// A payload of a type this node does not understand, kept verbatim.
    Unsupported(UnsupportedPayload),
}

impl Payload {
    /// Returns the payload type of the payload.
    pub fn kind(&self) -> u64 {
        match self {
            Self::Transaction(_) => TRANSACTION_PAYLOAD_TYPE,
            Self::Milestone(_) => MILESTONE_PAYLOAD_TYPE,
            Self::UnsignedData(_) => UNSIGNED_DATA_PAYLOAD_TYPE,
            Self::SignedData(_) => SIGNED_DATA_PAYLOAD_TYPE,
            Self::Indexation(_) => INDEXATION_PAYLOAD_TYPE,
            Self::Unsupported(unsupported) => unsupported.payload_type,
        }
    }

    /// Returns the packed length of the payload including its length prefix.
    pub fn prefixed_len(&self) -> usize {
        let len = self.packed_len();

        uvarint_len(len as u64) + len
    }

    /// Writes the payload prefixed with its varint length.
    pub fn write_prefixed<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        write_uvarint(writer, self.packed_len() as u64)?;
        self.pack(writer)
    }

    /// Reads a varint length prefix and the payload body behind it.
    ///
    /// A zero length yields `Error::EmptyPayload`; callers decide whether an
    /// empty payload is legal at their position.
    pub fn read_prefixed<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error> {
        let payload_length = read_uvarint(reader)?;

        if payload_length == 0 {
            return Err(Error::EmptyPayload);
        }

        // The body is bounded by its length prefix so an unknown payload can
        // be consumed without running into the fields behind it.
        let mut bytes = vec![0u8; payload_length as usize];
        reader.read_exact(&mut bytes)?;

        Self::unpack(&mut bytes.as_slice())
    }
}

impl Packable for Payload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        match self {
            Self::Transaction(payload) => payload.packed_len(),
            Self::Milestone(payload) => payload.packed_len(),
            Self::UnsignedData(payload) => payload.packed_len(),
            Self::SignedData(payload) => payload.packed_len(),
            Self::Indexation(payload) => payload.packed_len(),
            Self::Unsupported(payload) => payload.packed_len(),
        }
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            Self::Transaction(payload) => payload.pack(writer),
            Self::Milestone(payload) => payload.pack(writer),
            Self::UnsignedData(payload) => payload.pack(writer),
            Self::SignedData(payload) => payload.pack(writer),
            Self::Indexation(payload) => payload.pack(writer),
            Self::Unsupported(payload) => payload.pack(writer),
        }
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let mut body = Vec::new();
        reader.read_to_end(&mut body)?;

        let payload_type = read_uvarint_in_range(&mut body.as_slice(), PAYLOAD_TYPE_MAX)?;
        let mut body = body.as_slice();

        Ok(match payload_type {
            TRANSACTION_PAYLOAD_TYPE => {
                Self::Transaction(Box::new(SignedTransactionPayload::unpack(&mut body)?))
            }
            MILESTONE_PAYLOAD_TYPE => Self::Milestone(Box::new(MilestonePayload::unpack(&mut body)?)),
            UNSIGNED_DATA_PAYLOAD_TYPE => Self::UnsignedData(UnsignedDataPayload::unpack(&mut body)?),
            SIGNED_DATA_PAYLOAD_TYPE => Self::SignedData(SignedDataPayload::unpack(&mut body)?),
            INDEXATION_PAYLOAD_TYPE => Self::Indexation(IndexationPayload::unpack(&mut body)?),
            _ => {
                // An unknown type is consumed rather than rejected so the
                // message around it stays usable.
                let payload_type = read_uvarint(&mut body)?;

                Self::Unsupported(UnsupportedPayload::new(payload_type, body.to_vec()))
            }
        })
    }
}

/// A payload of an unknown type, retained verbatim so the containing message
/// re-encodes byte-identically.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsupportedPayload {
    payload_type: u64,
    data: Vec<u8>,
}

impl UnsupportedPayload {
    /// Creates a new `UnsupportedPayload`.
    pub fn new(payload_type: u64, data: Vec<u8>) -> Self {
        Self { payload_type, data }
    }

    /// Returns the type varint the payload arrived with.
    pub fn payload_type(&self) -> u64 {
        self.payload_type
    }

    /// Returns the undecoded body bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Packable for UnsupportedPayload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(self.payload_type) + self.data.len()
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, self.payload_type)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let payload_type = read_uvarint(reader)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        Ok(Self::new(payload_type, data))
    }
}

/// Reads the leading payload type varint and checks it against the expected one.
pub(crate) fn read_and_check_payload_type<R: Read + ?Sized>(reader: &mut R, expected: u64) -> Result<(), Error> {
    let payload_type = read_uvarint(reader)?;

    if payload_type != expected {
        return Err(Error::WrongPayloadType(payload_type, expected));
    }

    Ok(())
}
