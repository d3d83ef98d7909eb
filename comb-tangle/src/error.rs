// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error occurring when accessing the tangle stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying key-value storage failed; this is fatal for the node.
    #[error("storage error: {0}")]
    Storage(#[from] comb_storage::Error),
    /// A stored record could not be decoded.
    #[error("unpacking a stored record failed: {0}")]
    Unpack(#[from] comb_message::Error),
    /// A stored record has an unexpected length or shape.
    #[error("malformed stored record")]
    MalformedRecord,
    /// The snapshot information record is missing.
    #[error("snapshot information not found in the storage")]
    SnapshotInfoMissing,
}
