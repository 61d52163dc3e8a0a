//! Signaling Coordinator
//!
//! Tenant-scoped peer registry and connection-setup relay. The coordinator
//! owns all registry state and performs no I/O itself: the WebSocket front
//! end attaches one [`ClientSink`] per connection and feeds inbound text
//! frames through [`Coordinator::handle_text`].
//!
//! Broadcasts are always scoped to one tenant room, so peers of different
//! tenants never see each other.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::{debug, info, warn};

use hostlink_core::network::{decode_signaling, encode_signaling, SERVER_PEER_ID};
use hostlink_core::{
    DeviceInfo, PeerConnectionState, PeerId, PeerInfo, SignalingMessage, TenantId,
};

/// Identifies one attached client connection.
pub type ConnectionId = u64;

/// Outbound half of a client connection.
pub trait ClientSink: Send {
    /// Returns true while frames can still be delivered.
    fn is_open(&self) -> bool;

    /// Queues a text frame. Returns false if the connection is gone.
    fn send_text(&self, text: &str) -> bool;
}

/// Reasons an inbound frame is rejected with an `error` reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Message too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Join required before {0}")]
    NotJoined(&'static str),

    #[error("Sender mismatch: connection is {bound}, message claims {claimed}")]
    SenderMismatch { bound: String, claimed: String },

    #[error("Unexpected message type: {0}")]
    UnexpectedType(&'static str),

    #[error("Unknown connection")]
    UnknownConnection,
}

/// What the coordinator did with one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// The sender joined (or re-joined) its tenant room.
    Joined,
    /// The sender left its room.
    Left,
    /// Forwarded verbatim to the target peer.
    Relayed,
    /// Relayable, but the target is absent or its transport is closed.
    Dropped,
    /// Nothing to do (e.g. leave from a connection that never joined).
    Ignored,
    /// Answered with a single `error` reply.
    Rejected(CoordinatorError),
}

struct Connection {
    sink: Box<dyn ClientSink>,
    /// Peer bound to this connection by its last join.
    peer_id: Option<PeerId>,
}

struct Registration {
    connection: ConnectionId,
    tenant_id: TenantId,
    device_info: DeviceInfo,
    joined_at: u64,
    /// First sweep that found the transport non-open.
    non_open_since: Option<u64>,
}

/// Peer registry and relay.
pub struct Coordinator {
    max_message_size: usize,
    next_connection: ConnectionId,
    connections: HashMap<ConnectionId, Connection>,
    peers: HashMap<PeerId, Registration>,
    rooms: HashMap<TenantId, BTreeSet<PeerId>>,
}

impl Coordinator {
    /// Creates an empty coordinator accepting frames up to `max_message_size` bytes.
    pub fn new(max_message_size: usize) -> Self {
        Coordinator {
            max_message_size,
            next_connection: 1,
            connections: HashMap::new(),
            peers: HashMap::new(),
            rooms: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Registers a new client connection.
    pub fn attach(&mut self, sink: Box<dyn ClientSink>) -> ConnectionId {
        let id = self.next_connection;
        self.next_connection += 1;
        self.connections.insert(
            id,
            Connection {
                sink,
                peer_id: None,
            },
        );
        id
    }

    /// Removes a connection; its peer, if any, leaves its room.
    pub fn detach(&mut self, connection: ConnectionId, now_ms: u64) {
        if let Some(conn) = self.connections.remove(&connection) {
            if let Some(peer_id) = conn.peer_id {
                self.leave(&peer_id, now_ms);
            }
        }
    }

    // ------------------------------------------------------------------
    // Inbound frames
    // ------------------------------------------------------------------

    /// Handles one text frame from `connection`.
    ///
    /// Malformed input is answered with exactly one `error` reply and
    /// otherwise ignored.
    pub fn handle_text(&mut self, connection: ConnectionId, text: &str, now_ms: u64) -> Handled {
        if !self.connections.contains_key(&connection) {
            return Handled::Rejected(CoordinatorError::UnknownConnection);
        }

        let result = if text.len() > self.max_message_size {
            Err(CoordinatorError::TooLarge {
                size: text.len(),
                max: self.max_message_size,
            })
        } else {
            decode_signaling(text)
                .map_err(|e| CoordinatorError::Malformed(e.to_string()))
                .and_then(|message| self.dispatch(connection, message, text, now_ms))
        };

        match result {
            Ok(handled) => handled,
            Err(error) => {
                warn!("Rejected frame on connection {}: {}", connection, error);
                self.reply_error(connection, &error, now_ms);
                Handled::Rejected(error)
            }
        }
    }

    fn dispatch(
        &mut self,
        connection: ConnectionId,
        message: SignalingMessage,
        raw: &str,
        now_ms: u64,
    ) -> Result<Handled, CoordinatorError> {
        match message {
            SignalingMessage::Join {
                peer_id,
                tenant_id,
                device_info,
                ..
            } => {
                self.join(connection, &peer_id, &tenant_id, device_info, now_ms);
                Ok(Handled::Joined)
            }
            SignalingMessage::Leave { ref peer_id, .. } => {
                match self.bound_peer(connection) {
                    None => Ok(Handled::Ignored),
                    Some(bound) if bound != *peer_id => Err(CoordinatorError::SenderMismatch {
                        bound,
                        claimed: peer_id.clone(),
                    }),
                    Some(bound) => {
                        self.leave(&bound, now_ms);
                        Ok(Handled::Left)
                    }
                }
            }
            message if message.is_relayable() => self.relay(connection, &message, raw),
            other => Err(CoordinatorError::UnexpectedType(other.kind())),
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Registers `peer_id` in `tenant_id`'s room on `connection`.
    ///
    /// Replies to the joiner with the room's other members, then announces
    /// the joiner to them. A peer id already registered on another
    /// connection leaves first, so ids stay unique.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        peer_id: &str,
        tenant_id: &str,
        device_info: DeviceInfo,
        now_ms: u64,
    ) {
        if !self.connections.contains_key(&connection) {
            return;
        }

        let refresh = self
            .peers
            .get(peer_id)
            .is_some_and(|r| r.connection == connection && r.tenant_id == tenant_id);

        if !refresh {
            if let Some(previous) = self.bound_peer(connection) {
                self.leave(&previous, now_ms);
            }
            if let Some(old_connection) = self.peers.get(peer_id).map(|r| r.connection) {
                info!("Peer {} re-joined, replacing connection {}", peer_id, old_connection);
                self.leave(peer_id, now_ms);
            }
        }

        let registration = self.peers.entry(peer_id.to_string()).or_insert(Registration {
            connection,
            tenant_id: tenant_id.to_string(),
            device_info: device_info.clone(),
            joined_at: now_ms,
            non_open_since: None,
        });
        registration.device_info = device_info.clone();
        registration.non_open_since = None;

        if let Some(conn) = self.connections.get_mut(&connection) {
            conn.peer_id = Some(peer_id.to_string());
        }
        self.rooms
            .entry(tenant_id.to_string())
            .or_default()
            .insert(peer_id.to_string());

        let peers_list = SignalingMessage::PeersList {
            peer_id: SERVER_PEER_ID.to_string(),
            tenant_id: tenant_id.to_string(),
            timestamp: now_ms,
            peers: self.peers_in(tenant_id, Some(peer_id)),
        };
        self.send_to(connection, &peers_list);

        if refresh {
            debug!("Peer {} refreshed its registration", peer_id);
            return;
        }

        info!("Peer {} joined tenant {}", peer_id, tenant_id);
        let announcement = SignalingMessage::Join {
            peer_id: peer_id.to_string(),
            tenant_id: tenant_id.to_string(),
            timestamp: now_ms,
            device_info,
        };
        self.broadcast(tenant_id, Some(peer_id), &announcement);
    }

    /// Removes `peer_id` from its room and tells the remaining members.
    ///
    /// Empty rooms are deleted. Leaving an unknown peer is a no-op;
    /// returns whether the peer was registered.
    pub fn leave(&mut self, peer_id: &str, now_ms: u64) -> bool {
        let registration = match self.peers.remove(peer_id) {
            Some(registration) => registration,
            None => return false,
        };

        if let Some(conn) = self.connections.get_mut(&registration.connection) {
            if conn.peer_id.as_deref() == Some(peer_id) {
                conn.peer_id = None;
            }
        }

        let tenant_id = registration.tenant_id;
        let room_empty = match self.rooms.get_mut(&tenant_id) {
            Some(room) => {
                room.remove(peer_id);
                room.is_empty()
            }
            None => false,
        };
        if room_empty {
            self.rooms.remove(&tenant_id);
            debug!("Tenant room {} closed", tenant_id);
        }

        info!("Peer {} left tenant {}", peer_id, tenant_id);
        let notice = SignalingMessage::Leave {
            peer_id: peer_id.to_string(),
            tenant_id: tenant_id.clone(),
            timestamp: now_ms,
        };
        self.broadcast(&tenant_id, None, &notice);
        true
    }

    /// Forwards an offer, answer or ICE candidate verbatim to its target.
    ///
    /// The sender must be the peer bound to `connection`. An absent or
    /// closed target, or one in another tenant, drops the message silently.
    pub fn relay(
        &mut self,
        connection: ConnectionId,
        message: &SignalingMessage,
        raw: &str,
    ) -> Result<Handled, CoordinatorError> {
        let (sender, target) = match (message.peer_id(), message.target_peer_id()) {
            (Some(sender), Some(target)) => (sender, target),
            _ => return Err(CoordinatorError::UnexpectedType(message.kind())),
        };

        let bound = self
            .bound_peer(connection)
            .ok_or(CoordinatorError::NotJoined(message.kind()))?;
        let tenant_id = self
            .peers
            .get(&bound)
            .map(|r| r.tenant_id.clone())
            .ok_or(CoordinatorError::NotJoined(message.kind()))?;

        if bound != sender || message.tenant_id() != Some(tenant_id.as_str()) {
            return Err(CoordinatorError::SenderMismatch {
                bound,
                claimed: sender.to_string(),
            });
        }

        let delivered = self
            .peers
            .get(target)
            .filter(|r| r.tenant_id == tenant_id)
            .and_then(|r| self.connections.get(&r.connection))
            .filter(|c| c.sink.is_open())
            .is_some_and(|c| c.sink.send_text(raw));

        if delivered {
            debug!("Relayed {} {} -> {}", message.kind(), sender, target);
            Ok(Handled::Relayed)
        } else {
            debug!("Dropped {} from {} for absent peer {}", message.kind(), sender, target);
            Ok(Handled::Dropped)
        }
    }

    /// Removes peers whose transport has been non-open for more than
    /// `stale_after_ms`. Returns the removed peer ids, sorted.
    pub fn sweep(&mut self, now_ms: u64, stale_after_ms: u64) -> Vec<PeerId> {
        let mut stale = Vec::new();

        for (peer_id, registration) in self.peers.iter_mut() {
            let open = self
                .connections
                .get(&registration.connection)
                .is_some_and(|c| c.sink.is_open());

            if open {
                registration.non_open_since = None;
                continue;
            }

            let since = *registration.non_open_since.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) > stale_after_ms {
                stale.push(peer_id.clone());
            }
        }

        stale.sort();
        for peer_id in &stale {
            warn!("Sweeping stale peer {}", peer_id);
            self.leave(peer_id, now_ms);
        }
        stale
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of registered peers across all tenants.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Number of non-empty tenant rooms.
    pub fn tenant_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if `peer_id` is registered.
    pub fn is_registered(&self, peer_id: &str) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Members of `tenant_id`'s room, sorted by peer id, minus `exclude`.
    pub fn peers_in(&self, tenant_id: &str, exclude: Option<&str>) -> Vec<PeerInfo> {
        let room = match self.rooms.get(tenant_id) {
            Some(room) => room,
            None => return Vec::new(),
        };

        room.iter()
            .filter(|id| exclude != Some(id.as_str()))
            .filter_map(|id| {
                self.peers.get(id).map(|r| PeerInfo {
                    peer_id: id.clone(),
                    tenant_id: r.tenant_id.clone(),
                    device_info: r.device_info.clone(),
                    connection_state: PeerConnectionState::Connected,
                    connected_at: r.joined_at,
                    latency: None,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn bound_peer(&self, connection: ConnectionId) -> Option<PeerId> {
        self.connections
            .get(&connection)
            .and_then(|c| c.peer_id.clone())
    }

    fn send_to(&self, connection: ConnectionId, message: &SignalingMessage) {
        let conn = match self.connections.get(&connection) {
            Some(conn) if conn.sink.is_open() => conn,
            _ => return,
        };
        match encode_signaling(message) {
            Ok(text) => {
                if !conn.sink.send_text(&text) {
                    debug!("Connection {} closed before {}", connection, message.kind());
                }
            }
            Err(e) => warn!("Failed to encode {}: {}", message.kind(), e),
        }
    }

    fn broadcast(&self, tenant_id: &str, exclude: Option<&str>, message: &SignalingMessage) {
        let members = match self.rooms.get(tenant_id) {
            Some(room) => room,
            None => return,
        };
        let text = match encode_signaling(message) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {}: {}", message.kind(), e);
                return;
            }
        };

        for peer_id in members.iter().filter(|id| exclude != Some(id.as_str())) {
            let sink = self
                .peers
                .get(peer_id)
                .and_then(|r| self.connections.get(&r.connection))
                .map(|c| &c.sink);
            if let Some(sink) = sink.filter(|s| s.is_open()) {
                sink.send_text(&text);
            }
        }
    }

    fn reply_error(&self, connection: ConnectionId, error: &CoordinatorError, now_ms: u64) {
        self.send_to(
            connection,
            &SignalingMessage::Error {
                message: error.to_string(),
                timestamp: now_ms,
            },
        );
    }
}
