// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The TCP peering layer: a listener for inbound peers, reconnecting dialers
//! for the static peers, and the per-connection frame loops feeding the
//! intake pipeline.

use std::{sync::Arc, time::Duration};

use comb_protocol::{
    metrics::ServerMetrics,
    packet::{
        Header, HandshakePacket, MessagePacket, MessageRequestPacket, MilestoneRequestPacket, Packet,
        HANDSHAKE_COORDINATOR_LENGTH, HEADER_LENGTH, PROTOCOL_VERSION,
    },
    peer::{Peer, PeerId, PeerManager},
    workers::{ProcessorWorker, ProcessorWorkerEvent},
};
use comb_storage::backend::StorageBackend;
use comb_tangle::{MilestoneIndex, Tangle};
use comb_runtime::daemon::Daemon;
use log::{debug, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener, TcpStream,
    },
    sync::{mpsc, watch},
};

use crate::{
    config::{NetworkConfig, PeeringConfig, NodeConfig},
    Error,
};

/// Shutdown priority of the peering layer; intake stops first.
pub const PRIORITY_PEERING: u8 = 0;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);
const BUSY_BACKOFF: Duration = Duration::from_millis(10);

/// Everything a connection needs to talk protocol.
pub struct PeeringContext<B: StorageBackend> {
    pub(crate) tangle: Arc<Tangle<B>>,
    pub(crate) peer_manager: Arc<PeerManager>,
    pub(crate) processor: Arc<ProcessorWorker>,
    pub(crate) metrics: Arc<ServerMetrics>,
    pub(crate) handshake: HandshakePacket,
    pub(crate) minimum_version: u16,
    pub(crate) high_watermark: usize,
}

impl<B: StorageBackend> Clone for PeeringContext<B> {
    fn clone(&self) -> Self {
        Self {
            tangle: self.tangle.clone(),
            peer_manager: self.peer_manager.clone(),
            processor: self.processor.clone(),
            metrics: self.metrics.clone(),
            handshake: self.handshake.clone(),
            minimum_version: self.minimum_version,
            high_watermark: self.high_watermark,
        }
    }
}

impl<B: StorageBackend> PeeringContext<B> {
    /// Builds the connection context out of the node configuration.
    pub fn new(
        config: &NodeConfig,
        tangle: Arc<Tangle<B>>,
        peer_manager: Arc<PeerManager>,
        processor: Arc<ProcessorWorker>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        let port = config
            .network
            .bind_address
            .rsplit(':')
            .next()
            .and_then(|port| port.parse().ok())
            .unwrap_or(0);

        let mut coordinator = [0u8; HANDSHAKE_COORDINATOR_LENGTH];
        coordinator[..32].copy_from_slice(&config.protocol.coordinator_public_key);

        Self {
            tangle,
            peer_manager,
            processor,
            metrics,
            handshake: HandshakePacket::new(port, 0, coordinator, config.protocol.mwm, PROTOCOL_VERSION),
            minimum_version: config.protocol.minimum_version,
            high_watermark: config.network.high_watermark,
        }
    }

    fn handshake_now(&self) -> HandshakePacket {
        let mut handshake = self.handshake.clone();
        handshake.sent_timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|duration| duration.as_millis() as u64)
            .unwrap_or(0);
        handshake
    }
}

/// Spawns the listener and the static peer dialers on the daemon.
pub fn spawn_peering<B: StorageBackend>(
    daemon: &Daemon,
    context: PeeringContext<B>,
    network: &NetworkConfig,
    peering: &PeeringConfig,
) {
    info!(
        "Connection manager keeping between {} and {} peers.",
        network.low_watermark, network.high_watermark
    );

    // Connections observe this channel and hang up on shutdown.
    let (conn_shutdown_tx, conn_shutdown_rx) = watch::channel(false);

    let bind_address = network.bind_address.clone();
    let server_context = context.clone();
    let server_conn_shutdown = conn_shutdown_rx.clone();

    daemon.spawn("PeeringServer", PRIORITY_PEERING, move |mut shutdown| async move {
        let listener = match TcpListener::bind(&bind_address).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!("Binding the peering listener to {} failed: {}.", bind_address, e);
                return;
            }
        };

        info!("Listening for peers on {}.", bind_address);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                accepted = listener.accept() => {
                    let (stream, address) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            debug!("Accepting a peer failed: {}.", e);
                            continue;
                        }
                    };

                    if server_context.peer_manager.len() >= server_context.high_watermark {
                        debug!("Refusing inbound peer {}: high watermark reached.", address);
                        continue;
                    }

                    let context = server_context.clone();
                    let conn_shutdown = server_conn_shutdown.clone();

                    tokio::spawn(async move {
                        connection(stream, address.to_string(), None, context, conn_shutdown).await;
                    });
                }
            }
        }

        let _ = conn_shutdown_tx.send(true);
    });

    for (address, alias) in peering.peers.clone() {
        let context = context.clone();
        let conn_shutdown = conn_shutdown_rx.clone();
        let reconnect_interval = Duration::from_secs(network.reconnect_interval_secs);

        daemon.spawn("PeeringDialer", PRIORITY_PEERING, move |mut shutdown| async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    connected = TcpStream::connect(&address) => {
                        match connected {
                            Ok(stream) => {
                                connection(stream, address.clone(), alias.clone(), context.clone(), conn_shutdown.clone())
                                    .await;
                            }
                            Err(e) => debug!("Connecting to peer {} failed: {}.", address, e),
                        }
                    }
                }

                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = tokio::time::sleep(reconnect_interval) => {}
                }
            }
        });
    }
}

async fn connection<B: StorageBackend>(
    stream: TcpStream,
    endpoint: String,
    alias: Option<String>,
    context: PeeringContext<B>,
    mut conn_shutdown: watch::Receiver<bool>,
) {
    let (mut reader, mut writer) = stream.into_split();

    let handshake = match tokio::time::timeout(HANDSHAKE_TIMEOUT, exchange_handshakes(&mut reader, &mut writer, &context)).await
    {
        Ok(Ok(handshake)) => handshake,
        Ok(Err(e)) => {
            debug!("Handshaking with {} failed: {}.", endpoint, e);
            return;
        }
        Err(_) => {
            debug!("Handshaking with {} timed out.", endpoint);
            return;
        }
    };

    if !handshake.version_supported(context.minimum_version) {
        info!(
            "Dropping peer {}: version {} below minimum {}.",
            endpoint, handshake.version, context.minimum_version
        );
        return;
    }

    if handshake.coordinator != context.handshake.coordinator {
        info!("Dropping peer {}: foreign coordinator.", endpoint);
        return;
    }

    let (gossip_tx, mut gossip_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let peer = Arc::new(Peer::new(PeerId::new(endpoint.clone()), alias, gossip_tx));
    context.peer_manager.add(peer.clone());

    info!("Peer {} connected (version {}).", peer.alias(), handshake.version);

    // Writing runs on its own task so slow sockets never block the reads.
    let write_task = tokio::spawn(async move {
        while let Some(frame) = gossip_rx.recv().await {
            if writer.write_all(&frame).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        // A closed channel means the listener never ran; there is no shutdown
        // to wait for then.
        _ = async {
            if conn_shutdown.changed().await.is_err() {
                std::future::pending::<()>().await
            }
        } => {}
        _ = read_loop(&mut reader, &peer, &context) => {}
    }

    context.peer_manager.remove(peer.id());
    write_task.abort();

    info!("Peer {} disconnected.", peer.alias());
}

async fn exchange_handshakes<B: StorageBackend>(
    reader: &mut OwnedReadHalf,
    writer: &mut OwnedWriteHalf,
    context: &PeeringContext<B>,
) -> Result<HandshakePacket, Error> {
    writer.write_all(&context.handshake_now().to_frame()).await?;

    let header = read_header(reader).await?;

    if header.packet_type != HandshakePacket::ID {
        return Err(Error::Protocol(comb_protocol::Error::UnknownPacketType(
            header.packet_type,
        )));
    }

    let payload = read_payload(reader, header.packet_length as usize).await?;

    Ok(HandshakePacket::try_from_bytes(&payload).map_err(Error::Protocol)?)
}

async fn read_header(reader: &mut OwnedReadHalf) -> Result<Header, Error> {
    let mut bytes = [0u8; HEADER_LENGTH];
    reader.read_exact(&mut bytes).await?;

    Ok(Header::from_bytes(bytes))
}

async fn read_payload(reader: &mut OwnedReadHalf, length: usize) -> Result<Vec<u8>, Error> {
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    Ok(payload)
}

async fn read_loop<B: StorageBackend>(
    reader: &mut OwnedReadHalf,
    peer: &Arc<Peer>,
    context: &PeeringContext<B>,
) -> Result<(), Error> {
    loop {
        let header = read_header(reader).await?;
        let payload = read_payload(reader, header.packet_length as usize).await?;

        match header.packet_type {
            MessagePacket::ID => {
                // The busy probe throttles reads while the intake queue runs hot.
                while context.processor.is_busy() {
                    tokio::time::sleep(BUSY_BACKOFF).await;
                }

                match MessagePacket::try_from_bytes(&payload) {
                    Ok(packet) => {
                        context
                            .processor
                            .submit(ProcessorWorkerEvent {
                                bytes: packet.bytes,
                                from: Some(peer.id().clone()),
                                requested: None,
                            })
                            .await;
                    }
                    Err(e) => {
                        debug!("Invalid message packet from {}: {}.", peer.alias(), e);
                        peer.metrics().invalid_messages_inc();
                    }
                }
            }
            MilestoneRequestPacket::ID => match MilestoneRequestPacket::try_from_bytes(&payload) {
                Ok(packet) => answer_milestone_request(peer, context, packet)?,
                Err(e) => debug!("Invalid milestone request from {}: {}.", peer.alias(), e),
            },
            MessageRequestPacket::ID => match MessageRequestPacket::try_from_bytes(&payload) {
                Ok(packet) => answer_message_request(peer, context, &packet.message_id)?,
                Err(e) => debug!("Invalid message request from {}: {}.", peer.alias(), e),
            },
            HandshakePacket::ID => debug!("Ignoring repeated handshake from {}.", peer.alias()),
            packet_type => debug!("Unknown packet type {} from {}.", packet_type, peer.alias()),
        }
    }
}

fn answer_milestone_request<B: StorageBackend>(
    peer: &Arc<Peer>,
    context: &PeeringContext<B>,
    packet: MilestoneRequestPacket,
) -> Result<(), Error> {
    let index = if packet.index == 0 {
        context.tangle.latest_milestone_index()
    } else {
        MilestoneIndex(packet.index)
    };

    let Some(cached_milestone) = context.tangle.milestones().get(index)? else {
        return Ok(());
    };
    let Some(message_id) = cached_milestone.map(|entry| *entry.message_id()) else {
        return Ok(());
    };
    drop(cached_milestone);

    answer_message_request(peer, context, &message_id)
}

fn answer_message_request<B: StorageBackend>(
    peer: &Arc<Peer>,
    context: &PeeringContext<B>,
    message_id: &comb_message::MessageId,
) -> Result<(), Error> {
    use comb_message::packable::Packable;

    let Some(cached) = context.tangle.get(message_id)? else {
        return Ok(());
    };

    let bytes = cached.map(|message| message.pack_new()).and_then(|bytes| bytes.ok());
    drop(cached);

    if let Some(bytes) = bytes {
        if peer.send(MessagePacket::new(bytes).to_frame()) {
            context.metrics.messages_sent_inc();
        }
    }

    Ok(())
}
