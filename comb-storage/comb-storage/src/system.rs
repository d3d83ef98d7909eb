// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The system namespace holds node-global records: the storage health flag
//! and the snapshot information singleton.

/// Namespace prefix of system records.
pub const PREFIX_SYSTEM: u8 = 0;

/// Key of the storage health record within the system namespace.
pub const SYSTEM_KEY_HEALTH: u8 = 0;
/// Key of the snapshot information record within the system namespace.
pub const SYSTEM_KEY_SNAPSHOT_INFO: u8 = 1;
/// Key of the permanent taint marker within the system namespace.
pub const SYSTEM_KEY_TAINTED: u8 = 2;
