// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::ops::RangeInclusive;

use crate::packet::Packet;

/// The protocol version this node speaks.
pub const PROTOCOL_VERSION: u16 = 1;

/// The length of the coordinator public key field of the handshake.
pub const HANDSHAKE_COORDINATOR_LENGTH: usize = 64;

const HANDSHAKE_LENGTH: usize = 2 + 8 + HANDSHAKE_COORDINATOR_LENGTH + 1 + 2;

/// The information exchanged during the handshake phase between two peers.
///
/// Made up of:
/// - own server socket port (2 bytes)
/// - time at which the packet was sent, in milliseconds (8 bytes)
/// - own used coordinator public key (64 bytes)
/// - own used minimum weight magnitude (1 byte)
/// - protocol version (2 bytes)
///
/// All integers are big-endian.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandshakePacket {
    /// The server port of the sending node.
    pub server_port: u16,
    /// The sending time, milliseconds since the unix epoch.
    pub sent_timestamp: u64,
    /// The coordinator public key the sending node validates milestones with,
    /// left-aligned and zero padded.
    pub coordinator: [u8; HANDSHAKE_COORDINATOR_LENGTH],
    /// The minimum weight magnitude of the sending node.
    pub mwm: u8,
    /// The protocol version of the sending node.
    pub version: u16,
}

impl HandshakePacket {
    /// Creates a new `HandshakePacket`.
    pub fn new(
        server_port: u16,
        sent_timestamp: u64,
        coordinator: [u8; HANDSHAKE_COORDINATOR_LENGTH],
        mwm: u8,
        version: u16,
    ) -> Self {
        Self {
            server_port,
            sent_timestamp,
            coordinator,
            mwm,
            version,
        }
    }

    /// Returns whether the version of the peer is supported by this node.
    pub fn version_supported(&self, minimum_version: u16) -> bool {
        self.version >= minimum_version
    }
}

impl Packet for HandshakePacket {
    const ID: u8 = 1;

    fn size_range() -> RangeInclusive<usize> {
        HANDSHAKE_LENGTH..=HANDSHAKE_LENGTH
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let (port, rest) = bytes.split_at(2);
        let (timestamp, rest) = rest.split_at(8);
        let (coordinator, rest) = rest.split_at(HANDSHAKE_COORDINATOR_LENGTH);
        let (mwm, version) = rest.split_at(1);

        Self {
            // The lengths have been checked by the caller.
            server_port: u16::from_be_bytes(port.try_into().unwrap()),
            sent_timestamp: u64::from_be_bytes(timestamp.try_into().unwrap()),
            coordinator: coordinator.try_into().unwrap(),
            mwm: mwm[0],
            version: u16::from_be_bytes(version.try_into().unwrap()),
        }
    }

    fn size(&self) -> usize {
        HANDSHAKE_LENGTH
    }

    fn write_bytes(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.server_port.to_be_bytes());
        bytes.extend_from_slice(&self.sent_timestamp.to_be_bytes());
        bytes.extend_from_slice(&self.coordinator);
        bytes.push(self.mwm);
        bytes.extend_from_slice(&self.version.to_be_bytes());
    }
}
