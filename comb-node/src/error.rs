// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error occurring while setting up or running the node.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Reading a file failed.
    #[error("i/o error happened: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file could not be parsed.
    #[error("parsing the configuration failed: {0}")]
    ConfigParse(#[from] toml::de::Error),
    /// The configured log level is unknown.
    #[error("unknown log level \"{0}\"")]
    InvalidLogLevel(String),
    /// Setting up the logger backend failed.
    #[error("initializing the logger failed: {0}")]
    Logger(#[from] fern_logger::Error),
    /// The storage failed; fatal.
    #[error("storage error: {0}")]
    Storage(#[from] comb_storage::Error),
    /// The tangle stores failed; fatal.
    #[error("tangle error: {0}")]
    Tangle(#[from] comb_tangle::Error),
    /// The protocol layer failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] comb_protocol::Error),
    /// The configured private key does not match the stored identity.
    #[error("the configured private key does not match the stored identity")]
    IdentityMismatch,
    /// The configured or stored private key could not be parsed.
    #[error("invalid private key")]
    InvalidPrivateKey,
    /// A configured snapshot entry point is not a valid message id.
    #[error("invalid snapshot entry point \"{0}\"")]
    InvalidSnapshotEntryPoint(String),
    /// Revalidation needs snapshot information but none is stored.
    #[error("snapshot information not found in the storage")]
    SnapshotInfoMissing,
    /// The stored milestones end below the snapshot index.
    #[error("the latest milestone in the storage is older than the snapshot index")]
    MilestoneOlderThanSnapshot,
    /// A long running operation observed the shutdown signal and stopped.
    #[error("operation was aborted")]
    OperationAborted,
}
