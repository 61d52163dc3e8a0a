// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Events

use super::topology::NetworkTopology;
use crate::types::{DeviceInfo, PeerId};

/// Why a peer left the connection map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote closed or the path was lost.
    Disconnected,
    /// Negotiation failed (peer unreachable).
    Failed,
    /// The coordinator announced the peer left.
    Left,
    /// The local manager was closed.
    Closed,
}

/// Events emitted by the connection manager.
///
/// Inbound application messages are not events; they go through the
/// [`MessageRouter`](super::MessageRouter).
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// The transport to a peer reported success.
    Connected {
        peer_id: PeerId,
        device_info: DeviceInfo,
    },
    /// A peer was removed from all internal maps.
    Disconnected {
        peer_id: PeerId,
        reason: DisconnectReason,
    },
    /// Topology of a freshly connected peer.
    TopologyDetected {
        peer_id: PeerId,
        topology: NetworkTopology,
    },
    /// A steady-state failure scoped to one peer (or to signaling).
    Error {
        peer_id: Option<PeerId>,
        message: String,
    },
}
