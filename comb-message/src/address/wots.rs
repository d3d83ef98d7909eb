// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use crate::address::Error;

/// The length, in bytes, of a W-OTS address payload: 243 trits, five to a byte.
pub const WOTS_ADDRESS_LENGTH: usize = 49;

// Index of the last meaningful trit within the final T5B1 byte.
const LAST_TRIT_INDEX: usize = 2;

/// A W-OTS address, 243 balanced trits in T5B1 encoding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WotsAddress([u8; WOTS_ADDRESS_LENGTH]);

impl WotsAddress {
    /// Creates a `WotsAddress` from a byte slice, checking length, trit
    /// validity and that the last trit is zero.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; WOTS_ADDRESS_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidLength)?;

        // Each byte encodes five balanced trits as a value in [-121, 121].
        if bytes.iter().any(|b| (*b as i8) < -121 || (*b as i8) > 121) {
            return Err(Error::InvalidAddress);
        }

        // A valid address has its last trit set to zero.
        if trit_at(bytes[WOTS_ADDRESS_LENGTH - 1], LAST_TRIT_INDEX) != 0 {
            return Err(Error::InvalidAddress);
        }

        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for WotsAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for WotsAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Extracts the balanced trit at `index` from a T5B1 encoded byte.
fn trit_at(byte: u8, index: usize) -> i8 {
    let mut value = byte as i8 as i32;
    let mut trit = 0;

    for _ in 0..=index {
        trit = (value + 1).rem_euclid(3) - 1;
        value = (value - trit) / 3;
    }

    trit as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trit_extraction() {
        // 7 = 1 + 3·(-1) + 9·1 in balanced ternary.
        assert_eq!(trit_at(7, 0), 1);
        assert_eq!(trit_at(7, 1), -1);
        assert_eq!(trit_at(7, 2), 1);
        assert_eq!(trit_at(0, 2), 0);
    }
}
