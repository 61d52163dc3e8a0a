// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Manager Configuration

use std::time::Duration;

use crate::network::IceServer;
use crate::types::{DeviceInfo, PeerId, TenantId};

/// Default public STUN server.
pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

/// Configuration for a [`PeerManager`](super::PeerManager).
#[derive(Debug, Clone)]
pub struct PeerManagerConfig {
    /// Local peer id (UUID v4 by default).
    pub peer_id: PeerId,
    /// Tenant (property) this device belongs to.
    pub tenant_id: TenantId,
    /// Description announced on join.
    pub device_info: DeviceInfo,
    /// Signaling server URLs in priority order.
    pub signaling_servers: Vec<String>,
    /// STUN/TURN servers for the peer primitive.
    pub ice_servers: Vec<IceServer>,
    /// Per-server connect timeout.
    pub connect_timeout: Duration,
    /// Reconnect to signaling after the link drops.
    pub auto_reconnect: bool,
    /// Fixed delay between reconnect rounds.
    pub reconnect_interval: Duration,
    /// Interval between keepalive pings to open peers.
    pub keepalive_interval: Duration,
    /// Label of the data channel opened by the offering side.
    pub data_channel_label: String,
}

impl PeerManagerConfig {
    /// Creates a config with defaults and a generated peer id.
    pub fn new(tenant_id: &str, device_info: DeviceInfo) -> Self {
        PeerManagerConfig {
            peer_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            device_info,
            signaling_servers: Vec::new(),
            ice_servers: vec![IceServer::stun(DEFAULT_STUN_SERVER)],
            connect_timeout: Duration::from_secs(5),
            auto_reconnect: true,
            reconnect_interval: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(30),
            data_channel_label: "hostlink".to_string(),
        }
    }

    /// Uses a fixed peer id.
    pub fn with_peer_id(mut self, peer_id: &str) -> Self {
        self.peer_id = peer_id.to_string();
        self
    }

    /// Appends a signaling server (lower priority than those already added).
    pub fn with_signaling_server(mut self, url: &str) -> Self {
        self.signaling_servers.push(url.to_string());
        self
    }

    /// Replaces the ICE server list.
    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    /// Enables or disables automatic signaling reconnect.
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }
}
