// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peer Connection Manager
//!
//! Owns the signaling link, one peer primitive per remote peer, the peer
//! registry and the message router. Every mutation happens inside one of
//! the host-driven entry points:
//!
//! - [`PeerManager::connect`] / [`PeerManager::disconnect`]
//! - [`PeerManager::poll_signaling`] / [`PeerManager::handle_signaling_message`]
//! - [`PeerManager::handle_transport_event`]
//! - [`PeerManager::tick`] (keepalive and reconnect timers)
//! - [`PeerManager::send`]
//!
//! # Connection setup
//!
//! When a `join` or `peers-list` entry names an untracked peer, the side
//! with the lexicographically smaller peer id creates the data channel and
//! sends the offer; the other side waits for it. This keeps exactly one
//! connection per peer pair even though both sides learn about each other
//! at the same time.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::PeerManagerConfig;
use super::error::PeerError;
use super::events::{DisconnectReason, PeerEvent};
use super::router::{MessageHandler, MessageRouter, RouteAction};
use super::topology::{classify, NetworkTopology};
use crate::clock::{Clock, SystemClock};
use crate::events::{EventDispatcher, EventHandler};
use crate::network::{
    decode_p2p, encode_p2p, ConnectionState, IceCandidate, MessageBody, MessageKind,
    NetworkError, P2PMessage, PeerTransport, PeerTransportEvent, PeerTransportFactory,
    SignalingMessage, SignalingTransport, TransportState,
};
use crate::types::{DeviceInfo, MessageId, PeerConnectionState, PeerId, PeerInfo};

/// Result of [`PeerManager::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Id stamped on the message.
    pub message_id: MessageId,
    /// Peers whose open channel accepted the frame.
    pub delivered_to: Vec<PeerId>,
}

struct PeerLink<T> {
    transport: T,
    initiator: bool,
    channel_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Session {
    Idle,
    Active { server: String },
    Reconnecting { next_attempt_ms: u64 },
    Closed,
}

/// Per-process peer connection manager.
///
/// # Example
///
/// ```ignore
/// use hostlink_core::{DeviceInfo, DeviceType, PeerManager, PeerManagerConfig};
///
/// let config = PeerManagerConfig::new("hotel-1", DeviceInfo::new(DeviceType::Kitchen, "Pass"))
///     .with_signaling_server("ws://signal.local:8080");
/// let mut manager = PeerManager::new(config, WebSocketSignalingTransport::new(), factory);
/// manager.connect()?;
///
/// loop {
///     manager.poll_signaling();
///     manager.tick();
///     // feed PeerTransportEvents from the platform primitive
/// }
/// ```
pub struct PeerManager<S, F>
where
    S: SignalingTransport,
    F: PeerTransportFactory,
{
    config: PeerManagerConfig,
    signaling: S,
    factory: F,
    clock: Arc<dyn Clock>,
    peers: HashMap<PeerId, PeerInfo>,
    links: HashMap<PeerId, PeerLink<F::Transport>>,
    router: MessageRouter,
    events: EventDispatcher<PeerEvent>,
    session: Session,
    next_keepalive_ms: Option<u64>,
}

impl<S, F> PeerManager<S, F>
where
    S: SignalingTransport,
    F: PeerTransportFactory,
{
    /// Creates a manager using the system clock.
    pub fn new(config: PeerManagerConfig, signaling: S, factory: F) -> Self {
        PeerManager {
            config,
            signaling,
            factory,
            clock: Arc::new(SystemClock),
            peers: HashMap::new(),
            links: HashMap::new(),
            router: MessageRouter::new(),
            events: EventDispatcher::new(),
            session: Session::Idle,
            next_keepalive_ms: None,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Local peer id.
    pub fn peer_id(&self) -> &str {
        &self.config.peer_id
    }

    /// Local tenant id.
    pub fn tenant_id(&self) -> &str {
        &self.config.tenant_id
    }

    /// Active configuration.
    pub fn config(&self) -> &PeerManagerConfig {
        &self.config
    }

    /// Adds a connection event handler.
    pub fn add_event_handler(&mut self, handler: Arc<dyn EventHandler<PeerEvent>>) {
        self.events.add_handler(handler);
    }

    /// Registers the handler for one message kind.
    pub fn on(&mut self, kind: MessageKind, handler: Arc<dyn MessageHandler>) {
        self.router.on(kind, handler);
    }

    /// Adds a handler that sees every inbound message.
    pub fn on_message(&mut self, handler: Arc<dyn MessageHandler>) {
        self.router.on_message(handler);
    }

    /// Mutable access to the router.
    pub fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Connects to the first reachable signaling server and joins the
    /// tenant room.
    ///
    /// Servers are tried in priority order with `connect_timeout` each.
    /// Returns the URL of the server that accepted the connection.
    pub fn connect(&mut self) -> Result<String, PeerError> {
        if self.session == Session::Closed {
            return Err(PeerError::Closed);
        }

        let server = self.connect_any()?;
        self.announce()?;

        info!(
            "Peer {} joined tenant {} via {}",
            self.config.peer_id, self.config.tenant_id, server
        );

        let now = self.clock.now_ms();
        self.session = Session::Active {
            server: server.clone(),
        };
        self.next_keepalive_ms = Some(now + self.config.keepalive_interval.as_millis() as u64);
        Ok(server)
    }

    /// Closes every peer, the signaling link and all timers.
    ///
    /// Reachable from any state; calling it twice is a no-op.
    pub fn disconnect(&mut self) {
        if self.session == Session::Closed {
            return;
        }

        for (_, mut link) in self.links.drain() {
            link.transport.close();
        }

        if self.signaling.state() == ConnectionState::Connected {
            let leave = SignalingMessage::Leave {
                peer_id: self.config.peer_id.clone(),
                tenant_id: self.config.tenant_id.clone(),
                timestamp: self.clock.now_ms(),
            };
            let _ = self.signaling.send(&leave);
        }
        let _ = self.signaling.disconnect();

        self.session = Session::Closed;
        self.next_keepalive_ms = None;

        let events = self
            .peers
            .drain()
            .map(|(peer_id, _)| PeerEvent::Disconnected {
                peer_id,
                reason: DisconnectReason::Closed,
            })
            .collect();
        self.events.dispatch_all(events);
        info!("Peer {} disconnected", self.config.peer_id);
    }

    /// Drives the keepalive and reconnect timers.
    ///
    /// Inert before `connect()` and after `disconnect()`.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        match self.session.clone() {
            Session::Idle | Session::Closed => return,
            Session::Active { server } => {
                if self.signaling.state() != ConnectionState::Connected {
                    self.signaling_lost(&format!("link to {} dropped", server));
                }
            }
            Session::Reconnecting { next_attempt_ms } => {
                if now >= next_attempt_ms {
                    self.try_reconnect(now);
                }
            }
        }

        if let Some(next) = self.next_keepalive_ms {
            if now >= next {
                let outcome = self.send(MessageBody::Ping, None);
                debug!("Keepalive ping to {} peers", outcome.delivered_to.len());
                self.next_keepalive_ms =
                    Some(now + self.config.keepalive_interval.as_millis() as u64);
            }
        }
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Stamps and sends a message.
    ///
    /// Unicast when `target` is given, otherwise broadcast to every peer
    /// with an open channel. Peers without an open channel are skipped
    /// silently.
    pub fn send(&mut self, body: MessageBody, target: Option<&str>) -> SendOutcome {
        let message = P2PMessage::new(
            &self.config.tenant_id,
            &self.config.peer_id,
            self.clock.now_ms(),
            body,
        );
        let mut outcome = SendOutcome {
            message_id: message.message_id.clone(),
            delivered_to: Vec::new(),
        };

        let frame = match encode_p2p(&message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping outbound {} message: {}", message.kind().as_str(), e);
                return outcome;
            }
        };

        for (peer_id, link) in self.links.iter_mut() {
            if target.is_some_and(|t| t != peer_id) || !link.channel_open {
                continue;
            }
            match link.transport.send(&frame) {
                Ok(()) => outcome.delivered_to.push(peer_id.clone()),
                Err(e) => debug!("Send to {} failed: {}", peer_id, e),
            }
        }

        outcome
    }

    // ------------------------------------------------------------------
    // Signaling input
    // ------------------------------------------------------------------

    /// Drains the signaling transport, handling each message.
    ///
    /// Malformed frames are logged and dropped. Returns the number of
    /// messages handled.
    pub fn poll_signaling(&mut self) -> usize {
        let mut handled = 0;

        while matches!(self.session, Session::Active { .. }) {
            match self.signaling.receive() {
                Ok(Some(message)) => {
                    self.handle_signaling_message(message);
                    handled += 1;
                }
                Ok(None) => break,
                Err(e) if e.is_frame_error() => {
                    warn!("Dropping malformed signaling frame: {}", e);
                }
                Err(e) => {
                    self.signaling_lost(&e.to_string());
                    break;
                }
            }
        }

        handled
    }

    /// Handles one message from the coordinator.
    pub fn handle_signaling_message(&mut self, message: SignalingMessage) {
        if self.session == Session::Closed {
            return;
        }

        if let Some(tenant_id) = message.tenant_id() {
            if tenant_id != self.config.tenant_id {
                debug!("Ignoring {} for foreign tenant {}", message.kind(), tenant_id);
                return;
            }
        }

        match message {
            SignalingMessage::PeersList { peers, .. } => {
                for peer in peers {
                    self.track_peer(peer);
                }
            }
            SignalingMessage::Join {
                peer_id,
                tenant_id,
                device_info,
                ..
            } => {
                self.track_peer(PeerInfo::new(&peer_id, &tenant_id, device_info));
            }
            SignalingMessage::Leave { peer_id, .. } => {
                self.remove_peer(&peer_id, DisconnectReason::Left);
            }
            SignalingMessage::Offer {
                peer_id,
                target_peer_id,
                sdp,
                ..
            } if target_peer_id == self.config.peer_id => {
                self.handle_offer(&peer_id, &sdp);
            }
            SignalingMessage::Answer {
                peer_id,
                target_peer_id,
                sdp,
                ..
            } if target_peer_id == self.config.peer_id => {
                self.handle_answer(&peer_id, &sdp);
            }
            SignalingMessage::IceCandidate {
                peer_id,
                target_peer_id,
                candidate,
                ..
            } if target_peer_id == self.config.peer_id => {
                self.handle_remote_candidate(&peer_id, &candidate);
            }
            SignalingMessage::Error { message, .. } => {
                warn!("Signaling server error: {}", message);
                self.events.dispatch(PeerEvent::Error {
                    peer_id: None,
                    message,
                });
            }
            other => {
                debug!("Ignoring {} addressed to another peer", other.kind());
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport input
    // ------------------------------------------------------------------

    /// Handles a callback from the peer primitive of `peer_id`.
    pub fn handle_transport_event(&mut self, peer_id: &str, event: PeerTransportEvent) {
        if !self.links.contains_key(peer_id) {
            debug!("Transport event for unknown peer {}", peer_id);
            return;
        }

        match event {
            PeerTransportEvent::IceCandidate(candidate) => {
                self.signal(SignalingMessage::IceCandidate {
                    peer_id: self.config.peer_id.clone(),
                    tenant_id: self.config.tenant_id.clone(),
                    target_peer_id: peer_id.to_string(),
                    timestamp: self.clock.now_ms(),
                    candidate,
                });
            }
            PeerTransportEvent::StateChanged(TransportState::Connected) => {
                self.on_connected(peer_id);
            }
            PeerTransportEvent::StateChanged(TransportState::Connecting) => {}
            PeerTransportEvent::StateChanged(TransportState::Failed) => {
                self.fail_peer(peer_id, &NetworkError::NegotiationFailed("ICE failed".into()));
            }
            PeerTransportEvent::StateChanged(
                TransportState::Disconnected | TransportState::Closed,
            ) => {
                self.remove_peer(peer_id, DisconnectReason::Disconnected);
            }
            PeerTransportEvent::ChannelOpen => {
                if let Some(link) = self.links.get_mut(peer_id) {
                    link.channel_open = true;
                }
            }
            PeerTransportEvent::ChannelClosed => {
                if let Some(link) = self.links.get_mut(peer_id) {
                    link.channel_open = false;
                }
            }
            PeerTransportEvent::ChannelMessage(text) => {
                self.on_channel_message(peer_id, &text);
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All tracked peers.
    pub fn peers(&self) -> impl Iterator<Item = &PeerInfo> {
        self.peers.values()
    }

    /// One tracked peer.
    pub fn peer(&self, peer_id: &str) -> Option<&PeerInfo> {
        self.peers.get(peer_id)
    }

    /// Connection state of a tracked peer.
    pub fn peer_state(&self, peer_id: &str) -> Option<PeerConnectionState> {
        self.peers.get(peer_id).map(|p| p.connection_state)
    }

    /// Peers with an open data channel.
    pub fn connected_peers(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self
            .links
            .iter()
            .filter(|(_, link)| link.channel_open)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Returns true while the signaling link is up.
    pub fn is_signaling_connected(&self) -> bool {
        matches!(self.session, Session::Active { .. })
            && self.signaling.state() == ConnectionState::Connected
    }

    /// Signaling server currently in use.
    pub fn signaling_server(&self) -> Option<&str> {
        match &self.session {
            Session::Active { server } => Some(server),
            _ => None,
        }
    }

    /// Classifies the current path to a peer.
    ///
    /// `None` until the primitive reports a selected candidate pair.
    pub fn network_topology(&self, peer_id: &str) -> Option<NetworkTopology> {
        let link = self.links.get(peer_id)?;
        let stats = link.transport.selected_candidate_pair()?;
        let mut topology = classify(&stats);

        if topology.latency_ms.is_none() {
            topology.latency_ms = self
                .peers
                .get(peer_id)
                .and_then(|p| p.latency)
                .map(|l| l as f64);
        }
        Some(topology)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn connect_any(&mut self) -> Result<String, PeerError> {
        if self.config.signaling_servers.is_empty() {
            return Err(PeerError::SignalingUnavailable {
                attempted: 0,
                last_error: "no signaling servers configured".into(),
            });
        }

        let mut last_error = String::new();
        for url in &self.config.signaling_servers {
            match self.signaling.connect(url, self.config.connect_timeout) {
                Ok(()) => return Ok(url.clone()),
                Err(e) => {
                    warn!("Signaling server {} unavailable: {}", url, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(PeerError::SignalingUnavailable {
            attempted: self.config.signaling_servers.len(),
            last_error,
        })
    }

    fn announce(&mut self) -> Result<(), PeerError> {
        let join = SignalingMessage::Join {
            peer_id: self.config.peer_id.clone(),
            tenant_id: self.config.tenant_id.clone(),
            timestamp: self.clock.now_ms(),
            device_info: self.config.device_info.clone(),
        };
        self.signaling.send(&join)?;
        Ok(())
    }

    fn signaling_lost(&mut self, reason: &str) {
        warn!("Signaling link lost: {}", reason);
        let _ = self.signaling.disconnect();

        // Remotes drop us on the coordinator's leave. Renegotiate from the
        // next peers-list.
        for (_, mut link) in self.links.drain() {
            link.transport.close();
        }
        let dropped = self
            .peers
            .drain()
            .map(|(peer_id, _)| PeerEvent::Disconnected {
                peer_id,
                reason: DisconnectReason::Disconnected,
            })
            .collect();
        self.events.dispatch_all(dropped);

        self.session = if self.config.auto_reconnect {
            Session::Reconnecting {
                next_attempt_ms: self.clock.now_ms()
                    + self.config.reconnect_interval.as_millis() as u64,
            }
        } else {
            Session::Idle
        };

        self.events.dispatch(PeerEvent::Error {
            peer_id: None,
            message: format!("signaling lost: {}", reason),
        });
    }

    fn try_reconnect(&mut self, now: u64) {
        let result = self.connect_any().and_then(|server| {
            self.announce()?;
            Ok(server)
        });

        match result {
            Ok(server) => {
                info!("Reconnected to signaling server {}", server);
                self.session = Session::Active { server };
            }
            Err(e) => {
                debug!("Reconnect round failed: {}", e);
                self.session = Session::Reconnecting {
                    next_attempt_ms: now + self.config.reconnect_interval.as_millis() as u64,
                };
            }
        }
    }

    fn signal(&mut self, message: SignalingMessage) {
        if let Err(e) = self.signaling.send(&message) {
            warn!("Signaling send of {} failed: {}", message.kind(), e);
        }
    }

    fn set_state(&mut self, peer_id: &str, state: PeerConnectionState) {
        if let Some(peer) = self.peers.get_mut(peer_id) {
            peer.connection_state = state;
        }
    }

    fn track_peer(&mut self, mut info: PeerInfo) {
        if info.peer_id == self.config.peer_id
            || info.tenant_id != self.config.tenant_id
            || self.peers.contains_key(&info.peer_id)
        {
            return;
        }

        let peer_id = info.peer_id.clone();
        info.connection_state = PeerConnectionState::New;
        info.connected_at = 0;
        info.latency = None;
        self.peers.insert(peer_id.clone(), info);
        debug!("Tracking peer {}", peer_id);

        if self.config.peer_id < peer_id {
            self.initiate(&peer_id);
        }
    }

    fn initiate(&mut self, peer_id: &str) {
        let mut transport = match self.factory.create(peer_id, &self.config.ice_servers) {
            Ok(transport) => transport,
            Err(e) => return self.fail_peer(peer_id, &e),
        };

        let offer = transport
            .create_data_channel(&self.config.data_channel_label, true)
            .and_then(|_| transport.create_offer());

        match offer {
            Ok(sdp) => {
                self.links.insert(
                    peer_id.to_string(),
                    PeerLink {
                        transport,
                        initiator: true,
                        channel_open: false,
                    },
                );
                self.set_state(peer_id, PeerConnectionState::Connecting);
                self.signal(SignalingMessage::Offer {
                    peer_id: self.config.peer_id.clone(),
                    tenant_id: self.config.tenant_id.clone(),
                    target_peer_id: peer_id.to_string(),
                    timestamp: self.clock.now_ms(),
                    sdp,
                });
            }
            Err(e) => {
                transport.close();
                self.fail_peer(peer_id, &e);
            }
        }
    }

    fn handle_offer(&mut self, from: &str, sdp: &str) {
        if !self.peers.contains_key(from) {
            self.peers.insert(
                from.to_string(),
                PeerInfo::new(from, &self.config.tenant_id, DeviceInfo::default()),
            );
        }

        if let Some(link) = self.links.get(from) {
            if link.initiator && self.config.peer_id.as_str() < from {
                debug!("Ignoring colliding offer from {}", from);
                return;
            }
            if let Some(mut stale) = self.links.remove(from) {
                stale.transport.close();
            }
        }

        let mut transport = match self.factory.create(from, &self.config.ice_servers) {
            Ok(transport) => transport,
            Err(e) => return self.fail_peer(from, &e),
        };

        match transport.accept_offer(sdp) {
            Ok(answer) => {
                self.links.insert(
                    from.to_string(),
                    PeerLink {
                        transport,
                        initiator: false,
                        channel_open: false,
                    },
                );
                self.set_state(from, PeerConnectionState::Connecting);
                self.signal(SignalingMessage::Answer {
                    peer_id: self.config.peer_id.clone(),
                    tenant_id: self.config.tenant_id.clone(),
                    target_peer_id: from.to_string(),
                    timestamp: self.clock.now_ms(),
                    sdp: answer,
                });
            }
            Err(e) => {
                transport.close();
                self.fail_peer(from, &e);
            }
        }
    }

    fn handle_answer(&mut self, from: &str, sdp: &str) {
        let result = match self.links.get_mut(from) {
            Some(link) if link.initiator => link.transport.accept_answer(sdp),
            _ => {
                debug!("Dropping answer from {} without pending offer", from);
                return;
            }
        };

        if let Err(e) = result {
            self.fail_peer(from, &e);
        }
    }

    fn handle_remote_candidate(&mut self, from: &str, candidate: &IceCandidate) {
        match self.links.get_mut(from) {
            Some(link) => {
                if let Err(e) = link.transport.add_ice_candidate(candidate) {
                    warn!("Rejected ICE candidate from {}: {}", from, e);
                }
            }
            None => debug!("Dropping ICE candidate from unknown peer {}", from),
        }
    }

    fn on_connected(&mut self, peer_id: &str) {
        let now = self.clock.now_ms();
        let device_info = match self.peers.get_mut(peer_id) {
            Some(peer) if peer.connection_state != PeerConnectionState::Connected => {
                peer.connection_state = PeerConnectionState::Connected;
                peer.connected_at = now;
                peer.device_info.clone()
            }
            _ => return,
        };

        info!("Peer {} connected", peer_id);
        self.events.dispatch(PeerEvent::Connected {
            peer_id: peer_id.to_string(),
            device_info,
        });

        if let Some(topology) = self.network_topology(peer_id) {
            self.events.dispatch(PeerEvent::TopologyDetected {
                peer_id: peer_id.to_string(),
                topology,
            });
        }
    }

    fn on_channel_message(&mut self, peer_id: &str, text: &str) {
        let message = match decode_p2p(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed frame from {}: {}", peer_id, e);
                return;
            }
        };

        if message.tenant_id != self.config.tenant_id || message.sender_id != peer_id {
            warn!(
                "Dropping frame from {} claiming sender {} in tenant {}",
                peer_id, message.sender_id, message.tenant_id
            );
            return;
        }

        match self.router.dispatch(&message, self.clock.now_ms()) {
            RouteAction::None => {}
            RouteAction::ReplyPong { to, ping_timestamp } => {
                self.send(
                    MessageBody::Pong {
                        ping_timestamp: Some(ping_timestamp),
                    },
                    Some(&to),
                );
            }
            RouteAction::RecordLatency {
                peer_id,
                latency_ms,
            } => {
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    peer.latency = Some(latency_ms);
                }
            }
        }
    }

    fn fail_peer(&mut self, peer_id: &str, error: &NetworkError) {
        warn!("Peer {} unreachable: {}", peer_id, error);
        self.set_state(peer_id, PeerConnectionState::Failed);
        self.remove_peer(peer_id, DisconnectReason::Failed);
        self.events.dispatch(PeerEvent::Error {
            peer_id: Some(peer_id.to_string()),
            message: error.to_string(),
        });
    }

    fn remove_peer(&mut self, peer_id: &str, reason: DisconnectReason) {
        if let Some(mut link) = self.links.remove(peer_id) {
            link.transport.close();
        }

        if self.peers.remove(peer_id).is_some() {
            debug!("Removed peer {} ({:?})", peer_id, reason);
            self.events.dispatch(PeerEvent::Disconnected {
                peer_id: peer_id.to_string(),
                reason,
            });
        }
    }
}
