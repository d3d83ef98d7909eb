// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::{path::Path, str::FromStr};

use comb_message::MessageId;
use comb_protocol::config::{ProtocolConfig, ProtocolConfigBuilder};
use comb_storage_sled::config::{SledConfig, SledConfigBuilder};
use comb_tangle::{
    config::{TangleConfig, TangleConfigBuilder},
    MilestoneIndex,
};
use fern_logger::{LoggerConfig, LoggerConfigBuilder, LoggerOutputConfigBuilder, LOGGER_STDOUT_NAME};
use log::LevelFilter;
use serde::Deserialize;

use crate::Error;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:15600";
const DEFAULT_RECONNECT_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOW_WATERMARK: usize = 8;
const DEFAULT_HIGH_WATERMARK: usize = 16;
const DEFAULT_PEER_STORE_PATH: &str = "./peerStore";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Builder for the logger section.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSectionBuilder {
    level: Option<String>,
    color_enabled: Option<bool>,
}

impl LoggerSectionBuilder {
    fn finish(self) -> Result<LoggerConfig, Error> {
        let level = self.level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned());
        let level_filter = match level.as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => return Err(Error::InvalidLogLevel(level)),
        };

        Ok(LoggerConfigBuilder::default()
            .with_output(
                LoggerOutputConfigBuilder::new()
                    .name(LOGGER_STDOUT_NAME)
                    .level_filter(level_filter)
                    .color_enabled(self.color_enabled.unwrap_or(true)),
            )
            .finish())
    }
}

/// Builder for a [`NetworkConfig`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfigBuilder {
    bind_address: Option<String>,
    reconnect_interval_secs: Option<u64>,
    low_watermark: Option<usize>,
    high_watermark: Option<usize>,
    identity_private_key: Option<String>,
    peer_store_path: Option<String>,
}

impl NetworkConfigBuilder {
    /// Finishes the builder into a [`NetworkConfig`].
    pub fn finish(self) -> NetworkConfig {
        NetworkConfig {
            bind_address: self.bind_address.unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned()),
            reconnect_interval_secs: self.reconnect_interval_secs.unwrap_or(DEFAULT_RECONNECT_INTERVAL_SECS),
            low_watermark: self.low_watermark.unwrap_or(DEFAULT_LOW_WATERMARK),
            high_watermark: self.high_watermark.unwrap_or(DEFAULT_HIGH_WATERMARK),
            identity_private_key: self.identity_private_key,
            peer_store_path: self.peer_store_path.unwrap_or_else(|| DEFAULT_PEER_STORE_PATH.to_owned()),
        }
    }
}

/// Configuration of the network layer.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// The address the TCP listener binds to.
    pub bind_address: String,
    /// Seconds between reconnect attempts to static peers.
    pub reconnect_interval_secs: u64,
    /// Number of connections the manager tries to keep at least.
    pub low_watermark: usize,
    /// Number of connections above which inbound connections are refused.
    pub high_watermark: usize,
    /// Optional Ed25519 private key, hex encoded; must match the stored
    /// identity when one exists.
    pub identity_private_key: Option<String>,
    /// Directory holding the node identity; never share it.
    pub peer_store_path: String,
}

/// Builder for a [`PeeringConfig`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeeringConfigBuilder {
    peers: Option<Vec<String>>,
    peer_aliases: Option<Vec<String>>,
}

impl PeeringConfigBuilder {
    /// Finishes the builder into a [`PeeringConfig`]. Aliases are applied
    /// only when one is given for every static peer.
    pub fn finish(self) -> PeeringConfig {
        let peers = self.peers.unwrap_or_default();
        let aliases = self.peer_aliases.unwrap_or_default();

        let aliases = if peers.len() == aliases.len() {
            aliases.into_iter().map(Some).collect()
        } else {
            if !aliases.is_empty() {
                log::warn!(
                    "Ignoring peer aliases: got {} aliases for {} peers.",
                    aliases.len(),
                    peers.len()
                );
            }
            vec![None; peers.len()]
        };

        PeeringConfig {
            peers: peers.into_iter().zip(aliases).collect(),
        }
    }
}

/// Configuration of the static peers.
#[derive(Clone, Debug)]
pub struct PeeringConfig {
    /// The `address, alias` pairs of the static peers.
    pub peers: Vec<(String, Option<String>)>,
}

/// Builder for a [`SnapshotConfig`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotConfigBuilder {
    index: Option<u32>,
    entry_points: Option<Vec<String>>,
}

impl SnapshotConfigBuilder {
    /// Finishes the builder into a [`SnapshotConfig`].
    pub fn finish(self) -> Result<SnapshotConfig, Error> {
        let entry_points = self
            .entry_points
            .unwrap_or_default()
            .into_iter()
            .map(|hex_id| MessageId::from_str(&hex_id).map_err(|_| Error::InvalidSnapshotEntryPoint(hex_id)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SnapshotConfig {
            index: MilestoneIndex(self.index.unwrap_or(0)),
            entry_points,
        })
    }
}

/// Configuration of the snapshot a fresh database is anchored at.
#[derive(Clone, Debug)]
pub struct SnapshotConfig {
    /// The milestone index of the snapshot.
    pub index: MilestoneIndex,
    /// The solid entry points of the snapshot, hex message ids.
    pub entry_points: Vec<MessageId>,
}

/// Builder for a [`NodeConfig`], deserialized from the TOML configuration
/// file.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfigBuilder {
    #[serde(default)]
    logger: LoggerSectionBuilder,
    #[serde(default)]
    network: NetworkConfigBuilder,
    #[serde(default)]
    peering: PeeringConfigBuilder,
    #[serde(default)]
    protocol: ProtocolConfigBuilder,
    #[serde(default)]
    storage: SledConfigBuilder,
    #[serde(default)]
    caches: TangleConfigBuilder,
    #[serde(default)]
    snapshot: SnapshotConfigBuilder,
}

impl NodeConfigBuilder {
    /// Reads a builder from a TOML file; a missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        if !path.exists() {
            log::warn!("No configuration file at {}; using defaults.", path.display());
            return Ok(Self::default());
        }

        Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
    }

    /// Finishes the builder into a [`NodeConfig`].
    pub fn finish(self) -> Result<NodeConfig, Error> {
        Ok(NodeConfig {
            logger: self.logger.finish()?,
            network: self.network.finish(),
            peering: self.peering.finish(),
            protocol: self.protocol.finish()?,
            storage: self.storage.finish(),
            caches: self.caches.finish(),
            snapshot: self.snapshot.finish()?,
        })
    }
}

/// The full configuration of the node.
pub struct NodeConfig {
    /// The logger configuration.
    pub logger: LoggerConfig,
    /// The network configuration.
    pub network: NetworkConfig,
    /// The static peering configuration.
    pub peering: PeeringConfig,
    /// The protocol configuration.
    pub protocol: ProtocolConfig,
    /// The storage backend configuration.
    pub storage: SledConfig,
    /// The per-entity cache configuration.
    pub caches: TangleConfig,
    /// The snapshot anchoring configuration.
    pub snapshot: SnapshotConfig,
}
