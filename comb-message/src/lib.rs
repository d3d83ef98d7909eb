// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Message and payload types of the comb node, together with their binary codec.
//!
//! The wire format is varint-based: unsigned LEB128 for all variable-width
//! integers, little-endian for fixed-width ones. See the `payload` module for
//! the individual payload layouts.

#![warn(missing_docs)]

/// A module that provides types and syntactic validations of addresses.
pub mod address;
/// A module that provides the `Packable` serialization trait and varint helpers.
pub mod packable;
/// A module that provides types and syntactic validations of payloads.
pub mod payload;

mod error;
mod message;
mod message_id;

pub use self::{
    error::Error,
    message::{Message, MESSAGE_VERSION},
    message_id::{MessageId, MESSAGE_ID_LENGTH},
};
