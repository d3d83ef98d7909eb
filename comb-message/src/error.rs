// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error occurring when packing or unpacking messages and payloads.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error happened on the underlying reader or writer.
    #[error("i/o error happened: {0}")]
    Io(#[from] std::io::Error),
    /// The message version is not supported.
    #[error("message version {0} is not supported")]
    UnsupportedVersion(u64),
    /// The payload type does not match the expected one.
    #[error("payload type {0} does not match the expected type {1}")]
    WrongPayloadType(u64, u64),
    /// The payload length prefix at the top level was zero.
    #[error("invalid payload length")]
    InvalidPayloadLength,
    /// A sub-payload of a kind that is not allowed within a transaction.
    #[error("invalid sub-payload of type {0}")]
    InvalidSubPayload(u64),
    /// A varint was decoded whose value exceeds the maximum of its field.
    #[error("varint value out of range")]
    InvalidVarintRange,
    /// A varint did not terminate within ten bytes or overflowed 64 bits.
    #[error("malformed varint")]
    InvalidVarint,
    /// A length-zero payload where one is optional.
    #[error("empty payload")]
    EmptyPayload,
    /// A field holds a value that is not valid at this position.
    #[error("invalid payload value")]
    InvalidPayloadValue,
    /// An invalid address was found within an output.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] crate::address::Error),
}
