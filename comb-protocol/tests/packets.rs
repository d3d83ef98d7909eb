// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::MessageId;
use comb_protocol::{
    packet::{
        Header, HandshakePacket, MessagePacket, MessageRequestPacket, MilestoneRequestPacket, Packet, HEADER_LENGTH,
    },
    Error,
};

#[test]
fn header_round_trip() {
    let header = Header {
        packet_type: 2,
        packet_length: 1337,
    };

    assert_eq!(Header::from_bytes(header.to_bytes()), header);
}

#[test]
fn handshake_frame() {
    let handshake = HandshakePacket::new(15600, 1_700_000_000_000, [7u8; 64], 14, 1);
    let frame = handshake.to_frame();

    // One byte type, two bytes length, 77 bytes payload.
    assert_eq!(frame.len(), HEADER_LENGTH + 77);

    let header = Header::from_bytes(frame[..HEADER_LENGTH].try_into().unwrap());
    assert_eq!(header.packet_type, HandshakePacket::ID);
    assert_eq!(header.packet_length, 77);

    let parsed = HandshakePacket::try_from_bytes(&frame[HEADER_LENGTH..]).unwrap();
    assert_eq!(parsed, handshake);
    assert_eq!(parsed.server_port, 15600);
    assert_eq!(parsed.sent_timestamp, 1_700_000_000_000);
    assert_eq!(parsed.mwm, 14);
    assert_eq!(parsed.version, 1);
}

#[test]
fn handshake_wrong_length() {
    assert!(matches!(
        HandshakePacket::try_from_bytes(&[0u8; 76]),
        Err(Error::InvalidPayloadLength(76, 1))
    ));
}

#[test]
fn handshake_version_check() {
    let handshake = HandshakePacket::new(15600, 0, [0u8; 64], 14, 3);

    assert!(handshake.version_supported(1));
    assert!(handshake.version_supported(3));
    assert!(!handshake.version_supported(4));
}

#[test]
fn message_packet_round_trip() {
    let bytes = vec![1u8; 100];
    let packet = MessagePacket::new(bytes.clone());
    let frame = packet.to_frame();

    let parsed = MessagePacket::try_from_bytes(&frame[HEADER_LENGTH..]).unwrap();
    assert_eq!(parsed.bytes, bytes);
}

#[test]
fn message_packet_too_short() {
    assert!(matches!(
        MessagePacket::try_from_bytes(&[0u8; 10]),
        Err(Error::InvalidPayloadLength(10, 2))
    ));
}

#[test]
fn milestone_request_round_trip() {
    let packet = MilestoneRequestPacket::new(1234);
    let frame = packet.to_frame();

    assert_eq!(frame[0], MilestoneRequestPacket::ID);
    assert_eq!(
        MilestoneRequestPacket::try_from_bytes(&frame[HEADER_LENGTH..]).unwrap(),
        packet
    );
}

#[test]
fn message_request_round_trip() {
    let packet = MessageRequestPacket::new(MessageId::new([9u8; 32]));
    let frame = packet.to_frame();

    assert_eq!(frame[0], MessageRequestPacket::ID);
    assert_eq!(
        MessageRequestPacket::try_from_bytes(&frame[HEADER_LENGTH..]).unwrap(),
        packet
    );
}
