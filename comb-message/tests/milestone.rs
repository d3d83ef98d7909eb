// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{
    packable::{write_uvarint, Packable},
    payload::{MilestonePayload, MILESTONE_PAYLOAD_TYPE},
    Error,
};

#[test]
fn round_trip() {
    let milestone = MilestonePayload::new(7, 1_700_000_000, [1u8; 64], [2u8; 64]);
    let bytes = milestone.pack_new().unwrap();

    assert_eq!(bytes.len(), milestone.packed_len());
    assert_eq!(MilestonePayload::unpack(&mut bytes.as_slice()).unwrap(), milestone);
}

#[test]
fn index_at_max_is_accepted() {
    let milestone = MilestonePayload::new(u32::MAX, 0, [0u8; 64], [0u8; 64]);
    let bytes = milestone.pack_new().unwrap();

    assert_eq!(
        MilestonePayload::unpack(&mut bytes.as_slice()).unwrap().index(),
        u32::MAX
    );
}

#[test]
fn index_above_max_is_rejected() {
    let mut bytes = Vec::new();
    write_uvarint(&mut bytes, MILESTONE_PAYLOAD_TYPE).unwrap();
    write_uvarint(&mut bytes, u32::MAX as u64 + 1).unwrap();
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 128]);

    assert!(matches!(
        MilestonePayload::unpack(&mut bytes.as_slice()),
        Err(Error::InvalidVarintRange)
    ));
}

#[test]
fn essence_excludes_signature() {
    let milestone = MilestonePayload::new(7, 1_700_000_000, [1u8; 64], [2u8; 64]);
    let essence = milestone.essence();
    let bytes = milestone.pack_new().unwrap();

    // The essence is the packed payload minus the leading type varint and the
    // trailing signature.
    assert_eq!(essence.as_slice(), &bytes[1..bytes.len() - 64]);
}
