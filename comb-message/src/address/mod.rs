// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Address types and their bech32 string encoding.

mod ed25519;
mod wots;

pub use self::{
    ed25519::{Ed25519Address, ED25519_ADDRESS_LENGTH},
    wots::{WotsAddress, WOTS_ADDRESS_LENGTH},
};

use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use thiserror::Error;

use crate::packable::Read;

/// Error occurring when parsing or validating addresses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The human-readable prefix does not name a known network.
    #[error("invalid prefix")]
    InvalidPrefix,
    /// The address version byte is unknown.
    #[error("invalid version")]
    InvalidVersion,
    /// The address payload has the wrong length for its version.
    #[error("invalid length")]
    InvalidLength,
    /// The address payload is malformed, e.g. a non-zero last trit.
    #[error("invalid address")]
    InvalidAddress,
    /// The bech32 string itself could not be decoded.
    #[error("invalid bech32 encoding: {0}")]
    Bech32(#[from] bech32::Error),
    /// An I/O error happened while reading an address.
    #[error("i/o error happened: {0}")]
    Io(#[from] std::io::Error),
}

/// Address version of a W-OTS address.
pub const WOTS_VERSION: u8 = 0;
/// Address version of an Ed25519 address.
pub const ED25519_VERSION: u8 = 1;

const HRP_STRINGS: [&str; 2] = ["iot", "tio"];

/// The network an address string belongs to, selecting its bech32 prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Prefix {
    /// The production network, prefix `iot`.
    Mainnet,
    /// The development network, prefix `tio`.
    Devnet,
}

impl Prefix {
    /// Returns the human-readable prefix string.
    pub fn hrp(&self) -> &'static str {
        HRP_STRINGS[*self as usize]
    }
}

impl core::fmt::Display for Prefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.hrp())
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iot" => Ok(Self::Mainnet),
            "tio" => Ok(Self::Devnet),
            _ => Err(Error::InvalidPrefix),
        }
    }
}

/// An address of one of the supported versions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Address {
    /// A W-OTS address.
    Wots(WotsAddress),
    /// An Ed25519 address.
    Ed25519(Ed25519Address),
}

impl Address {
    /// Returns the version byte of the address.
    pub fn version(&self) -> u8 {
        match self {
            Self::Wots(_) => WOTS_VERSION,
            Self::Ed25519(_) => ED25519_VERSION,
        }
    }

    /// Returns the raw payload bytes of the address, without the version byte.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Wots(address) => address.as_ref(),
            Self::Ed25519(address) => address.as_ref(),
        }
    }

    /// Returns the length of the raw payload bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns whether the address payload is empty; it never is.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Creates an address of the given version from raw payload bytes.
    pub fn from_raw(version: u8, bytes: &[u8]) -> Result<Self, Error> {
        match version {
            WOTS_VERSION => Ok(Self::Wots(WotsAddress::try_from_bytes(bytes)?)),
            ED25519_VERSION => Ok(Self::Ed25519(Ed25519Address::try_from_bytes(bytes)?)),
            _ => Err(Error::InvalidVersion),
        }
    }

    /// Reads the raw payload of an address of the given version from a reader.
    pub(crate) fn unpack_raw<R: Read + ?Sized>(version: u8, reader: &mut R) -> Result<Self, Error> {
        match version {
            WOTS_VERSION => {
                let mut bytes = [0u8; WOTS_ADDRESS_LENGTH];
                reader.read_exact(&mut bytes)?;
                Ok(Self::Wots(WotsAddress::try_from_bytes(&bytes)?))
            }
            ED25519_VERSION => {
                let mut bytes = [0u8; ED25519_ADDRESS_LENGTH];
                reader.read_exact(&mut bytes)?;
                Ok(Self::Ed25519(Ed25519Address::try_from_bytes(&bytes)?))
            }
            _ => Err(Error::InvalidVersion),
        }
    }

    /// Encodes the address as a bech32 string: the version byte first in the
    /// data part, the raw payload bytes after.
    pub fn to_bech32(&self, prefix: Prefix) -> String {
        let mut data = Vec::with_capacity(1 + self.len());
        data.push(self.version());
        data.extend_from_slice(self.as_bytes());

        // The prefixes are valid bech32 human-readable parts.
        bech32::encode(prefix.hrp(), data.to_base32(), Variant::Bech32).expect("invalid bech32 prefix")
    }

    /// Decodes a bech32 encoded address string.
    pub fn parse_bech32(s: &str) -> Result<(Prefix, Self), Error> {
        let (hrp, data, variant) = bech32::decode(s)?;

        if variant != Variant::Bech32 {
            return Err(Error::InvalidAddress);
        }

        let prefix = Prefix::from_str(&hrp)?;
        let data = Vec::<u8>::from_base32(&data)?;

        let (version, payload) = data.split_first().ok_or(Error::InvalidVersion)?;
        let address = Self::from_raw(*version, payload)?;

        Ok((prefix, address))
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}
