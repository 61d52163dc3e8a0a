// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Signaling Message Types
//!
//! Connection-setup wire protocol exchanged with the signaling coordinator.
//! JSON envelopes tagged by `type`, with camelCase fields.

use serde::{Deserialize, Serialize};

use crate::types::{DeviceInfo, PeerId, PeerInfo, TenantId};

/// Peer id the coordinator uses for messages it originates.
pub const SERVER_PEER_ID: &str = "server";

/// An ICE candidate as produced by the local peer primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    /// Creates a candidate for the first media section.
    pub fn new(candidate: &str) -> Self {
        IceCandidate {
            candidate: candidate.to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_m_line_index: Some(0),
        }
    }
}

/// Messages on the signaling stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalingMessage {
    /// A peer announces itself to its tenant room.
    Join {
        peer_id: PeerId,
        tenant_id: TenantId,
        timestamp: u64,
        device_info: DeviceInfo,
    },
    /// A peer left its tenant room.
    Leave {
        peer_id: PeerId,
        tenant_id: TenantId,
        timestamp: u64,
    },
    /// Current room members, sent by the coordinator to a joining peer.
    PeersList {
        peer_id: PeerId,
        tenant_id: TenantId,
        timestamp: u64,
        peers: Vec<PeerInfo>,
    },
    /// Session offer addressed to one peer.
    Offer {
        peer_id: PeerId,
        tenant_id: TenantId,
        target_peer_id: PeerId,
        timestamp: u64,
        sdp: String,
    },
    /// Session answer addressed to one peer.
    Answer {
        peer_id: PeerId,
        tenant_id: TenantId,
        target_peer_id: PeerId,
        timestamp: u64,
        sdp: String,
    },
    /// Trickled ICE candidate addressed to one peer.
    IceCandidate {
        peer_id: PeerId,
        tenant_id: TenantId,
        target_peer_id: PeerId,
        timestamp: u64,
        candidate: IceCandidate,
    },
    /// Coordinator rejected a frame from this client.
    Error { message: String, timestamp: u64 },
}

impl SignalingMessage {
    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            SignalingMessage::Join { .. } => "join",
            SignalingMessage::Leave { .. } => "leave",
            SignalingMessage::PeersList { .. } => "peers-list",
            SignalingMessage::Offer { .. } => "offer",
            SignalingMessage::Answer { .. } => "answer",
            SignalingMessage::IceCandidate { .. } => "ice-candidate",
            SignalingMessage::Error { .. } => "error",
        }
    }

    /// Sending peer, if the message carries one.
    pub fn peer_id(&self) -> Option<&str> {
        match self {
            SignalingMessage::Join { peer_id, .. }
            | SignalingMessage::Leave { peer_id, .. }
            | SignalingMessage::PeersList { peer_id, .. }
            | SignalingMessage::Offer { peer_id, .. }
            | SignalingMessage::Answer { peer_id, .. }
            | SignalingMessage::IceCandidate { peer_id, .. } => Some(peer_id),
            SignalingMessage::Error { .. } => None,
        }
    }

    /// Tenant the message belongs to, if any.
    pub fn tenant_id(&self) -> Option<&str> {
        match self {
            SignalingMessage::Join { tenant_id, .. }
            | SignalingMessage::Leave { tenant_id, .. }
            | SignalingMessage::PeersList { tenant_id, .. }
            | SignalingMessage::Offer { tenant_id, .. }
            | SignalingMessage::Answer { tenant_id, .. }
            | SignalingMessage::IceCandidate { tenant_id, .. } => Some(tenant_id),
            SignalingMessage::Error { .. } => None,
        }
    }

    /// Addressee of a relayable message.
    pub fn target_peer_id(&self) -> Option<&str> {
        match self {
            SignalingMessage::Offer { target_peer_id, .. }
            | SignalingMessage::Answer { target_peer_id, .. }
            | SignalingMessage::IceCandidate { target_peer_id, .. } => Some(target_peer_id),
            _ => None,
        }
    }

    /// Returns true for offer, answer and ice-candidate.
    pub fn is_relayable(&self) -> bool {
        self.target_peer_id().is_some()
    }
}
