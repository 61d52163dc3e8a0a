// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Transport Traits
//!
//! Platform-agnostic abstractions over the two networking primitives the
//! connection manager drives: the persistent signaling stream and the
//! per-peer connection-negotiation primitive with its data channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::NetworkError;
use super::signaling::{IceCandidate, SignalingMessage};

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, NetworkError>;

/// Signaling link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to any server.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready.
    Connected,
}

/// Signaling transport trait.
///
/// Abstracts the persistent message stream to a signaling coordinator
/// (WebSocket in production) so the connection manager can be tested
/// with a mock.
///
/// # Synchronous Interface
///
/// `receive` never blocks for long: it returns `Ok(None)` when no frame is
/// waiting, so a host event loop can poll it between other callbacks.
pub trait SignalingTransport: Send {
    /// Connects to one signaling server, giving up after `timeout`.
    fn connect(&mut self, url: &str, timeout: Duration) -> TransportResult<()>;

    /// Closes the link. Safe to call when not connected.
    fn disconnect(&mut self) -> TransportResult<()>;

    /// Returns the current link state.
    fn state(&self) -> ConnectionState;

    /// Sends one message.
    fn send(&mut self, message: &SignalingMessage) -> TransportResult<()>;

    /// Returns the next inbound message, if any.
    ///
    /// A frame that fails to decode is reported as `InvalidMessage`; the
    /// link stays usable.
    fn receive(&mut self) -> TransportResult<Option<SignalingMessage>>;
}

/// STUN/TURN server handed to the peer primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    /// A credential-less STUN server.
    pub fn stun(url: &str) -> Self {
        IceServer {
            urls: vec![url.to_string()],
            username: None,
            credential: None,
        }
    }
}

/// ICE candidate type of one side of the selected pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateType {
    /// Local interface address.
    Host,
    /// Server-reflexive (address seen by STUN).
    Srflx,
    /// Peer-reflexive.
    Prflx,
    /// TURN relay address.
    Relay,
}

/// Statistics of the winning ICE candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePairStats {
    pub local_candidate_type: CandidateType,
    pub remote_candidate_type: CandidateType,
    /// Current round trip in milliseconds, if measured.
    pub round_trip_time_ms: Option<f64>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Connection state reported by the peer primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    /// Remote closed or the path was lost.
    Disconnected,
    /// Negotiation failed.
    Failed,
    Closed,
}

/// Callbacks from the peer primitive, fed back into the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerTransportEvent {
    /// A local ICE candidate was gathered.
    IceCandidate(IceCandidate),
    /// The connection state changed.
    StateChanged(TransportState),
    /// The data channel (local or inbound) is open.
    ChannelOpen,
    /// The data channel closed.
    ChannelClosed,
    /// A text frame arrived on the data channel.
    ChannelMessage(String),
}

/// Per-peer connection-negotiation primitive.
///
/// One instance exists per remote peer. Asynchronous results (candidates,
/// state changes, channel traffic) are delivered by the host as
/// [`PeerTransportEvent`]s.
pub trait PeerTransport: Send {
    /// Opens the local data channel. Called only by the offering side.
    fn create_data_channel(&mut self, label: &str, ordered: bool) -> TransportResult<()>;

    /// Creates an offer and applies it as the local description.
    fn create_offer(&mut self) -> TransportResult<String>;

    /// Applies a remote offer and returns the local answer.
    fn accept_offer(&mut self, sdp: &str) -> TransportResult<String>;

    /// Applies the remote answer to a previously created offer.
    fn accept_answer(&mut self, sdp: &str) -> TransportResult<()>;

    /// Adds a remote ICE candidate.
    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> TransportResult<()>;

    /// Sends a text frame on the data channel.
    fn send(&mut self, data: &str) -> TransportResult<()>;

    /// Returns the selected candidate pair once connected.
    fn selected_candidate_pair(&self) -> Option<CandidatePairStats>;

    /// Closes channel and connection. Idempotent.
    fn close(&mut self);
}

/// Creates peer primitives, one per remote peer.
pub trait PeerTransportFactory: Send {
    type Transport: PeerTransport;

    /// Creates a primitive for `remote_peer_id` using the given ICE servers.
    fn create(
        &mut self,
        remote_peer_id: &str,
        ice_servers: &[IceServer],
    ) -> TransportResult<Self::Transport>;
}
