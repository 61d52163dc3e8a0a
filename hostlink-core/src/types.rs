// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared Data Types
//!
//! Peer identity and device description types used on both the signaling
//! wire and inside the connection manager.

use serde::{Deserialize, Serialize};

/// Unique peer identifier (UUID v4 string unless configured).
pub type PeerId = String;

/// Tenant (property) identifier. Trusted input, never validated.
pub type TenantId = String;

/// Unique message identifier (UUID v4 string).
pub type MessageId = String;

/// Kind of device participating in the property network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Staff,
    Guest,
    Kitchen,
    Printer,
    Iot,
    /// Any device type this build does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Self-description a device announces when joining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeviceInfo {
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl DeviceInfo {
    /// Creates a device description without capabilities.
    pub fn new(device_type: DeviceType, name: &str) -> Self {
        DeviceInfo {
            device_type,
            name: name.to_string(),
            capabilities: Vec::new(),
        }
    }

    /// Adds a capability tag (e.g. `"print"`, `"orders"`).
    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.push(capability.to_string());
        self
    }

    /// Returns true if the device advertises the given capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Per-remote-peer connection state.
///
/// `new → connecting → connected → {disconnected | failed} → closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeerConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl PeerConnectionState {
    /// Returns true once the peer can no longer carry traffic.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PeerConnectionState::Disconnected
                | PeerConnectionState::Failed
                | PeerConnectionState::Closed
        )
    }
}

/// A peer as seen by one connection manager (or listed by the coordinator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub peer_id: PeerId,
    pub tenant_id: TenantId,
    pub device_info: DeviceInfo,
    #[serde(default)]
    pub connection_state: PeerConnectionState,
    /// Unix milliseconds when the peer joined or connected.
    #[serde(default)]
    pub connected_at: u64,
    /// Last measured round trip in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
}

impl PeerInfo {
    /// Creates a peer record in the `new` state.
    pub fn new(peer_id: &str, tenant_id: &str, device_info: DeviceInfo) -> Self {
        PeerInfo {
            peer_id: peer_id.to_string(),
            tenant_id: tenant_id.to_string(),
            device_info,
            connection_state: PeerConnectionState::New,
            connected_at: 0,
            latency: None,
        }
    }
}
