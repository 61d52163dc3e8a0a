// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hostlink Core Library
//!
//! Local-first communication substrate for property networks. Staff, guest,
//! kitchen and printer devices find each other through a signaling
//! coordinator, then exchange messages over direct peer data channels.
//! A beacon proximity detector turns noisy signal-strength samples into a
//! stable zone estimate used to route those messages contextually.
//!
//! # Layers
//!
//! - [`network`]: wire protocol, transport traits, mock and WebSocket transports
//! - [`peer`]: connection manager, message router, topology monitor
//! - [`proximity`]: Kalman smoothing, distance estimation, location context
//! - [`events`]: typed event dispatch shared by the layers above

pub mod clock;
pub mod events;
pub mod network;
pub mod peer;
pub mod proximity;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{CallbackHandler, EventDispatcher, EventHandler};
pub use network::{
    CandidatePairStats, CandidateType, IceCandidate, IceServer, MessageBody, MessageKind,
    MockPeerTransport, MockPeerTransportFactory, MockSignalingTransport, NetworkError,
    P2PMessage, Payload, PeerTransport, PeerTransportEvent, PeerTransportFactory,
    SignalingMessage, SignalingTransport, TransportState,
};
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use network::WebSocketSignalingTransport;
pub use peer::{
    DisconnectReason, MessageHandler, MessageRouter, NetworkTopology, PeerError, PeerEvent,
    PeerManager, PeerManagerConfig, SendOutcome, TopologyKind,
};
pub use proximity::{
    estimate_distance, parse_directory, AccuracyTier, Advertisement, BeaconConfig,
    BeaconDetection, BeaconScanner, Coordinates, DistanceCategory, HttpBeaconDirectory,
    KalmanFilter, LocationContext, MockBeaconScanner, ProtocolIds, ProximityDetector,
    ProximityError, ProximityEvent, ScanConfig,
};
pub use types::{DeviceInfo, DeviceType, MessageId, PeerConnectionState, PeerId, PeerInfo, TenantId};
