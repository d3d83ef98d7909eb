// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::{
    address::Address,
    packable::{read_uvarint_in_range, uvarint_len, write_uvarint, Packable, Read, Write},
    payload::{
        read_and_check_payload_type, Payload, INDEXATION_PAYLOAD_TYPE, SIGNED_DATA_PAYLOAD_TYPE,
        UNSIGNED_DATA_PAYLOAD_TYPE,
    },
    Error,
};

/// The payload type of a signed transaction.
pub const TRANSACTION_PAYLOAD_TYPE: u64 = 0;

/// Maximum number of inputs, outputs or unlock blocks of a transaction.
const TRANSACTION_ITEM_COUNT_MAX: u64 = 127;

/// A reference to the output of a previous transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UtxoInput {
    transaction_id: [u8; 32],
    output_index: u64,
}

impl UtxoInput {
    /// Creates a new `UtxoInput`.
    pub fn new(transaction_id: [u8; 32], output_index: u64) -> Self {
        Self {
            transaction_id,
            output_index,
        }
    }

    /// Returns the identifier of the referenced transaction.
    pub fn transaction_id(&self) -> &[u8; 32] {
        &self.transaction_id
    }

    /// Returns the index of the referenced output within that transaction.
    pub fn output_index(&self) -> u64 {
        self.output_index
    }
}

impl Packable for UtxoInput {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(0) + 32 + uvarint_len(self.output_index)
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        // Input type, only UTXO references exist.
        write_uvarint(writer, 0)?;
        self.transaction_id.pack(writer)?;
        write_uvarint(writer, self.output_index)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let input_type = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;

        if input_type != 0 {
            return Err(Error::InvalidPayloadValue);
        }

        let transaction_id = <[u8; 32]>::unpack(reader)?;
        let output_index = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;

        Ok(Self {
            transaction_id,
            output_index,
        })
    }
}

/// A deposit to a single address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigLockedSingleOutput {
    address: Address,
    amount: u64,
}

impl SigLockedSingleOutput {
    /// Creates a new `SigLockedSingleOutput`.
    pub fn new(address: Address, amount: u64) -> Self {
        Self { address, amount }
    }

    /// Returns the target address of the deposit.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the deposited amount.
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

impl Packable for SigLockedSingleOutput {
    type Error = Error;

    fn packed_len(&self) -> usize {
        uvarint_len(0) + uvarint_len(self.address.version() as u64) + self.address.len() + 8
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        // Output type, only single-address deposits exist.
        write_uvarint(writer, 0)?;
        write_uvarint(writer, self.address.version() as u64)?;
        writer.write_all(self.address.as_bytes())?;
        self.amount.pack(writer)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let output_type = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;

        if output_type != 0 {
            return Err(Error::InvalidPayloadValue);
        }

        let address_version = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;
        let address = Address::unpack_raw(address_version as u8, reader)?;
        let amount = u64::unpack(reader)?;

        Ok(Self { address, amount })
    }
}

/// An unlock block authorizing the spend of an input.
///
/// The body carries no mandated structure yet; the count is part of the wire
/// format and is preserved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnlockBlock;

/// The unsigned part of a transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsignedTransaction {
    inputs: Vec<UtxoInput>,
    outputs: Vec<SigLockedSingleOutput>,
    payload: Option<Payload>,
}

impl UnsignedTransaction {
    /// Creates a new `UnsignedTransaction`.
    pub fn new(inputs: Vec<UtxoInput>, outputs: Vec<SigLockedSingleOutput>, payload: Option<Payload>) -> Self {
        Self {
            inputs,
            outputs,
            payload,
        }
    }

    /// Returns the inputs of the transaction.
    pub fn inputs(&self) -> &[UtxoInput] {
        &self.inputs
    }

    /// Returns the outputs of the transaction.
    pub fn outputs(&self) -> &[SigLockedSingleOutput] {
        &self.outputs
    }

    /// Returns the optional sub-payload of the transaction.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

/// A transaction together with the unlock blocks authorizing its inputs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedTransactionPayload {
    transaction: UnsignedTransaction,
    unlock_blocks: Vec<UnlockBlock>,
}

impl SignedTransactionPayload {
    /// Creates a new `SignedTransactionPayload`.
    pub fn new(transaction: UnsignedTransaction, unlock_blocks: Vec<UnlockBlock>) -> Self {
        Self {
            transaction,
            unlock_blocks,
        }
    }

    /// Returns the unsigned transaction.
    pub fn transaction(&self) -> &UnsignedTransaction {
        &self.transaction
    }

    /// Returns the unlock blocks.
    pub fn unlock_blocks(&self) -> &[UnlockBlock] {
        &self.unlock_blocks
    }
}

impl Packable for SignedTransactionPayload {
    type Error = Error;

    fn packed_len(&self) -> usize {
        let payload_len = match self.transaction.payload.as_ref() {
            Some(payload) => payload.prefixed_len(),
            None => uvarint_len(0),
        };

        uvarint_len(TRANSACTION_PAYLOAD_TYPE)
            + uvarint_len(TRANSACTION_PAYLOAD_TYPE)
            + uvarint_len(self.transaction.inputs.len() as u64)
            + self.transaction.inputs.iter().map(Packable::packed_len).sum::<usize>()
            + uvarint_len(self.transaction.outputs.len() as u64)
            + self.transaction.outputs.iter().map(Packable::packed_len).sum::<usize>()
            + payload_len
            + uvarint_len(self.unlock_blocks.len() as u64)
    }

    fn pack<W: Write>(&self, writer: &mut W) -> Result<(), Self::Error> {
        write_uvarint(writer, TRANSACTION_PAYLOAD_TYPE)?;
        // The transaction type of the unsigned part.
        write_uvarint(writer, TRANSACTION_PAYLOAD_TYPE)?;

        write_uvarint(writer, self.transaction.inputs.len() as u64)?;
        for input in &self.transaction.inputs {
            input.pack(writer)?;
        }

        write_uvarint(writer, self.transaction.outputs.len() as u64)?;
        for output in &self.transaction.outputs {
            output.pack(writer)?;
        }

        match self.transaction.payload.as_ref() {
            Some(payload) => payload.write_prefixed(writer)?,
            None => write_uvarint(writer, 0)?,
        }

        write_uvarint(writer, self.unlock_blocks.len() as u64)?;

        Ok(())
    }

    fn unpack<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        read_and_check_payload_type(reader, TRANSACTION_PAYLOAD_TYPE)?;
        // The transaction type of the unsigned part.
        read_and_check_payload_type(reader, TRANSACTION_PAYLOAD_TYPE)?;

        let input_count = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            inputs.push(UtxoInput::unpack(reader)?);
        }

        let output_count = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            outputs.push(SigLockedSingleOutput::unpack(reader)?);
        }

        let payload = match Payload::read_prefixed(reader) {
            Ok(payload) => match payload.kind() {
                UNSIGNED_DATA_PAYLOAD_TYPE | SIGNED_DATA_PAYLOAD_TYPE | INDEXATION_PAYLOAD_TYPE => Some(payload),
                kind => return Err(Error::InvalidSubPayload(kind)),
            },
            Err(Error::EmptyPayload) => None,
            Err(e) => return Err(e),
        };

        let unlock_block_count = read_uvarint_in_range(reader, TRANSACTION_ITEM_COUNT_MAX)?;
        let unlock_blocks = (0..unlock_block_count).map(|_| UnlockBlock).collect();

        Ok(Self {
            transaction: UnsignedTransaction {
                inputs,
                outputs,
                payload,
            },
            unlock_blocks,
        })
    }
}
