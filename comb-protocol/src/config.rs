// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

use crate::Error;

const DEFAULT_MINIMUM_VERSION: u16 = 1;
const DEFAULT_MWM: u8 = 14;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Builder for a [`ProtocolConfig`], deserialized from the `protocol` section
/// of the node configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfigBuilder {
    minimum_version: Option<u16>,
    mwm: Option<u8>,
    coordinator_public_key: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl ProtocolConfigBuilder {
    /// Creates a new `ProtocolConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the coordinator public key, hex encoded.
    pub fn with_coordinator_public_key(mut self, coordinator_public_key: impl Into<String>) -> Self {
        self.coordinator_public_key.replace(coordinator_public_key.into());
        self
    }

    /// Sets the minimum handshake version accepted from peers.
    pub fn with_minimum_version(mut self, minimum_version: u16) -> Self {
        self.minimum_version.replace(minimum_version);
        self
    }

    /// Finishes the builder into a [`ProtocolConfig`].
    pub fn finish(self) -> Result<ProtocolConfig, Error> {
        let coordinator_public_key = match self.coordinator_public_key {
            Some(hex_key) => {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(hex_key, &mut bytes).map_err(|_| Error::InvalidCoordinatorPublicKey)?;
                bytes
            }
            None => [0u8; 32],
        };

        Ok(ProtocolConfig {
            minimum_version: self.minimum_version.unwrap_or(DEFAULT_MINIMUM_VERSION),
            mwm: self.mwm.unwrap_or(DEFAULT_MWM),
            coordinator_public_key,
            request_timeout_secs: self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}

/// Configuration of the protocol layer.
#[derive(Clone, Debug)]
pub struct ProtocolConfig {
    /// The minimum handshake version accepted from peers.
    pub minimum_version: u16,
    /// The minimum weight magnitude advertised during the handshake.
    pub mwm: u8,
    /// The Ed25519 public key milestones must be signed with.
    pub coordinator_public_key: [u8; 32],
    /// Seconds before a pending request is requeued.
    pub request_timeout_secs: u64,
}
