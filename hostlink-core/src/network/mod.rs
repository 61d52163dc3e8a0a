// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network + Transport Layer
//!
//! Wire protocols and transport abstractions for peer communication.
//!
//! # Architecture
//!
//! The network layer consists of:
//! - **Signaling messages**: connection-setup protocol spoken with the coordinator
//! - **Peer messages**: typed application messages on the data channel
//! - **Protocol layer**: JSON encoding and boundary validation
//! - **Transport traits**: signaling stream and per-peer negotiation primitive
//! - **Mocks**: in-memory transports for tests
//! - **WebSocket**: production signaling transport

mod error;
mod message;
mod mock;
mod protocol;
mod signaling;
mod transport;

#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
mod websocket;

// Error types
pub use error::NetworkError;

// Message types
pub use message::{MessageBody, MessageKind, P2PMessage, Payload};
pub use signaling::{IceCandidate, SignalingMessage, SERVER_PEER_ID};

// Protocol utilities
pub use protocol::{decode_p2p, decode_signaling, encode_p2p, encode_signaling, MAX_MESSAGE_SIZE};

// Transport abstraction
pub use transport::{
    CandidatePairStats, CandidateType, ConnectionState, IceServer, PeerTransport,
    PeerTransportEvent, PeerTransportFactory, SignalingTransport, TransportResult,
    TransportState,
};

// Mock transports for testing
pub use mock::{MockPeerState, MockPeerTransport, MockPeerTransportFactory, MockSignalingTransport};

// WebSocket transport for production
#[cfg(any(feature = "network-native-tls", feature = "network-rustls"))]
pub use websocket::WebSocketSignalingTransport;
