// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The protocol workers: message intake, milestone validation, milestone
//! solidification, request dispatch and the status printer.
//!
//! Shutdown runs in ascending priority order: intake first, then the workers
//! it feeds, the stores are flushed by the node afterwards.

mod milestone_payload;
mod processor;
mod requester;
mod solidifier;
mod status;

pub use self::{
    milestone_payload::{MilestonePayloadWorker, MilestonePayloadWorkerEvent},
    processor::{ProcessorWorker, ProcessorWorkerEvent},
    requester::RequesterWorker,
    solidifier::{MilestoneSolidifierWorker, MilestoneSolidifierWorkerEvent},
    status::StatusWorker,
};

/// Shutdown priority of the intake workers.
pub const PRIORITY_PROCESSOR: u8 = 1;
/// Shutdown priority of the milestone payload worker.
pub const PRIORITY_MILESTONE_PAYLOAD: u8 = 2;
/// Shutdown priority of the milestone solidifier worker.
pub const PRIORITY_SOLIDIFIER: u8 = 3;
/// Shutdown priority of the requester worker.
pub const PRIORITY_REQUESTER: u8 = 4;
/// Shutdown priority of the status worker.
pub const PRIORITY_STATUS: u8 = 5;

/// Returns the current unix time in seconds.
pub(crate) fn unix_now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
