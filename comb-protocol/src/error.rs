// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error occurring in the protocol layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A packet advertised an unknown type.
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),
    /// A packet payload has a length outside the range of its type.
    #[error("invalid packet payload length {0} for packet type {1}")]
    InvalidPayloadLength(usize, u8),
    /// The protocol version of a peer is below the supported minimum.
    #[error("protocol version {0} is not supported")]
    VersionNotSupported(u16),
    /// A peer handshook with a different coordinator public key.
    #[error("coordinator public key mismatch")]
    CoordinatorMismatch,
    /// The configured coordinator public key cannot be parsed.
    #[error("invalid coordinator public key")]
    InvalidCoordinatorPublicKey,
    /// Accessing the tangle failed; fatal.
    #[error("tangle error: {0}")]
    Tangle(#[from] comb_tangle::Error),
}
