// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::address::Error;

/// The length, in bytes, of an Ed25519 address payload.
pub const ED25519_ADDRESS_LENGTH: usize = 32;

/// An Ed25519 address, the BLAKE2b-256 hash of a public key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ed25519Address([u8; ED25519_ADDRESS_LENGTH]);

impl Ed25519Address {
    /// Creates a new `Ed25519Address`.
    pub fn new(bytes: [u8; ED25519_ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Creates an `Ed25519Address` from a byte slice, checking its length.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(bytes.try_into().map_err(|_| Error::InvalidLength)?))
    }
}

impl AsRef<[u8]> for Ed25519Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for Ed25519Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
