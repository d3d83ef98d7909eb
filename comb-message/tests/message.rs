// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{
    packable::{write_uvarint, Packable},
    payload::{IndexationPayload, MilestonePayload, Payload, UnsignedDataPayload},
    Error, Message, MessageId,
};

fn indexation_message() -> Message {
    Message::new(
        MessageId::new([1u8; 32]),
        MessageId::new([2u8; 32]),
        Payload::Indexation(IndexationPayload::new([3u8; 16])),
        42,
    )
}

#[test]
fn round_trip_indexation() {
    let message = indexation_message();
    let bytes = message.pack_new().unwrap();

    assert_eq!(bytes.len(), message.packed_len());
    assert_eq!(Message::unpack(&mut bytes.as_slice()).unwrap(), message);
}

#[test]
fn round_trip_unsigned_data() {
    let message = Message::new(
        MessageId::null(),
        MessageId::new([9u8; 32]),
        Payload::UnsignedData(UnsignedDataPayload::new(b"hello tangle".to_vec())),
        u64::MAX,
    );
    let bytes = message.pack_new().unwrap();

    assert_eq!(bytes.len(), message.packed_len());
    assert_eq!(Message::unpack(&mut bytes.as_slice()).unwrap(), message);
}

#[test]
fn round_trip_milestone() {
    let message = Message::new(
        MessageId::new([4u8; 32]),
        MessageId::new([5u8; 32]),
        Payload::Milestone(Box::new(MilestonePayload::new(1337, 1_600_000_000, [6u8; 64], [7u8; 64]))),
        0,
    );
    let bytes = message.pack_new().unwrap();

    assert_eq!(bytes.len(), message.packed_len());
    assert_eq!(Message::unpack(&mut bytes.as_slice()).unwrap(), message);
}

#[test]
fn id_is_stable() {
    let message = indexation_message();

    assert_eq!(message.id(), message.id());
    assert_ne!(message.id(), Message::new(*message.parent1(), *message.parent2(), message.payload().clone(), 43).id());
}

#[test]
fn unsupported_version() {
    let mut bytes = Vec::new();
    write_uvarint(&mut bytes, 2).unwrap();
    bytes.extend_from_slice(&[0u8; 64]);

    assert!(matches!(
        Message::unpack(&mut bytes.as_slice()),
        Err(Error::UnsupportedVersion(2))
    ));
}

#[test]
fn empty_payload_is_invalid_length() {
    let mut bytes = Vec::new();
    write_uvarint(&mut bytes, 1).unwrap();
    bytes.extend_from_slice(&[0u8; 64]);
    // Zero payload length.
    write_uvarint(&mut bytes, 0).unwrap();
    bytes.extend_from_slice(&0u64.to_le_bytes());

    assert!(matches!(
        Message::unpack(&mut bytes.as_slice()),
        Err(Error::InvalidPayloadLength)
    ));
}

#[test]
fn unknown_payload_type_is_consumed() {
    let message = indexation_message();
    let mut bytes = message.pack_new().unwrap();

    // Rewrite the payload into an unknown type of the same total length.
    let payload_offset = 1 + 32 + 32;
    let payload_len = message.payload().packed_len();
    bytes[payload_offset] = payload_len as u8;
    bytes[payload_offset + 1] = 42;

    let unpacked = Message::unpack(&mut bytes.as_slice()).unwrap();

    match unpacked.payload() {
        Payload::Unsupported(unsupported) => {
            assert_eq!(unsupported.payload_type(), 42);
            assert_eq!(unsupported.data().len(), payload_len - 1);
        }
        payload => panic!("expected an unsupported payload, got {:?}", payload),
    }

    // The nonce behind the payload is still read correctly.
    assert_eq!(unpacked.nonce(), 42);
    // And the message re-encodes byte-identically.
    assert_eq!(unpacked.pack_new().unwrap(), bytes);
}

#[test]
fn payload_type_out_of_range() {
    let message = indexation_message();
    let mut bytes = message.pack_new().unwrap();

    let payload_offset = 1 + 32 + 32;
    // 16384 encodes as [0x80, 0x80, 0x01]; patch type and keep the length consistent.
    let payload_len = message.payload().packed_len() + 2;
    bytes[payload_offset] = payload_len as u8;
    bytes.splice(payload_offset + 1..payload_offset + 2, [0x80u8, 0x80, 0x01]);

    assert!(matches!(
        Message::unpack(&mut bytes.as_slice()),
        Err(Error::InvalidVarintRange)
    ));
}
