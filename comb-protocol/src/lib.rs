// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Types and workers enabling the comb node protocol: the peer wire packets,
//! the request queue driving parent resolution, and the worker pipeline from
//! message intake to milestone solidification.

/// A module that provides the protocol configuration.
pub mod config;
/// A module that provides the events published by the workers.
pub mod event;
/// A module that provides the in-process protocol metrics.
pub mod metrics;
/// A module that provides the type-length-value packets of the peer wire.
pub mod packet;
/// A module that provides the connected-peer registry.
pub mod peer;
/// A module that provides the request queue.
pub mod request;
/// A module that provides the protocol workers.
pub mod workers;

mod error;

pub use self::error::Error;
