// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The type-length-value packets of the peer wire.
//!
//! A frame is a one-byte packet type, a two-byte big-endian payload length
//! and the payload itself. The handshake must be the first frame in both
//! directions of a connection.

mod handshake;
mod message;
mod message_request;
mod milestone_request;

pub use self::{
    handshake::{HandshakePacket, HANDSHAKE_COORDINATOR_LENGTH, PROTOCOL_VERSION},
    message::MessagePacket,
    message_request::MessageRequestPacket,
    milestone_request::MilestoneRequestPacket,
};

use std::ops::RangeInclusive;

use crate::Error;

/// The length of a packet header: type byte plus big-endian payload length.
pub const HEADER_LENGTH: usize = 3;

/// A decoded packet header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    /// The type of the packet behind the header.
    pub packet_type: u8,
    /// The length of the packet payload.
    pub packet_length: u16,
}

impl Header {
    /// Decodes a header from its wire bytes.
    pub fn from_bytes(bytes: [u8; HEADER_LENGTH]) -> Self {
        Self {
            packet_type: bytes[0],
            packet_length: u16::from_be_bytes([bytes[1], bytes[2]]),
        }
    }

    /// Encodes the header into its wire bytes.
    pub fn to_bytes(self) -> [u8; HEADER_LENGTH] {
        let length = self.packet_length.to_be_bytes();

        [self.packet_type, length[0], length[1]]
    }
}

/// A packet of the peer wire.
pub trait Packet: Sized {
    /// The type marker of the packet.
    const ID: u8;

    /// The valid payload length range of the packet.
    fn size_range() -> RangeInclusive<usize>;

    /// Decodes the packet from a payload of already checked length.
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Returns the payload length of this instance.
    fn size(&self) -> usize;

    /// Appends the payload bytes to `bytes`.
    fn write_bytes(&self, bytes: &mut Vec<u8>);

    /// Checks the payload length and decodes the packet.
    fn try_from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if !Self::size_range().contains(&bytes.len()) {
            return Err(Error::InvalidPayloadLength(bytes.len(), Self::ID));
        }

        Ok(Self::from_bytes(bytes))
    }

    /// Encodes the packet into a full frame, header included.
    fn to_frame(&self) -> Vec<u8> {
        let size = self.size();
        let mut bytes = Vec::with_capacity(HEADER_LENGTH + size);

        bytes.extend_from_slice(
            &Header {
                packet_type: Self::ID,
                packet_length: size as u16,
            }
            .to_bytes(),
        );
        self.write_bytes(&mut bytes);

        bytes
    }
}
