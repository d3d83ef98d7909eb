// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_message::{
    address::{Address, Ed25519Address},
    packable::Packable,
    payload::{
        IndexationPayload, MilestonePayload, Payload, SigLockedSingleOutput, SignedTransactionPayload, UnlockBlock,
        UnsignedTransaction, UtxoInput,
    },
    Error,
};

fn transaction(payload: Option<Payload>) -> SignedTransactionPayload {
    SignedTransactionPayload::new(
        UnsignedTransaction::new(
            vec![UtxoInput::new([1u8; 32], 0)],
            vec![SigLockedSingleOutput::new(
                Address::Ed25519(Ed25519Address::new([2u8; 32])),
                1_000_000,
            )],
            payload,
        ),
        vec![UnlockBlock],
    )
}

#[test]
fn round_trip_without_sub_payload() {
    let payload = transaction(None);
    let bytes = payload.pack_new().unwrap();

    assert_eq!(bytes.len(), payload.packed_len());
    assert_eq!(SignedTransactionPayload::unpack(&mut bytes.as_slice()).unwrap(), payload);
}

#[test]
fn round_trip_with_indexation_sub_payload() {
    let payload = transaction(Some(Payload::Indexation(IndexationPayload::new([7u8; 16]))));
    let bytes = payload.pack_new().unwrap();

    assert_eq!(bytes.len(), payload.packed_len());
    assert_eq!(SignedTransactionPayload::unpack(&mut bytes.as_slice()).unwrap(), payload);
}

#[test]
fn milestone_sub_payload_is_rejected() {
    let payload = transaction(Some(Payload::Milestone(Box::new(MilestonePayload::new(
        1,
        0,
        [0u8; 64],
        [0u8; 64],
    )))));
    let bytes = payload.pack_new().unwrap();

    assert!(matches!(
        SignedTransactionPayload::unpack(&mut bytes.as_slice()),
        Err(Error::InvalidSubPayload(1))
    ));
}

#[test]
fn unlock_block_count_is_preserved() {
    let payload = SignedTransactionPayload::new(
        UnsignedTransaction::new(vec![], vec![], None),
        vec![UnlockBlock, UnlockBlock, UnlockBlock],
    );
    let bytes = payload.pack_new().unwrap();
    let unpacked = SignedTransactionPayload::unpack(&mut bytes.as_slice()).unwrap();

    assert_eq!(unpacked.unlock_blocks().len(), 3);
}
