// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Test Fixtures
//!
//! Canned signaling messages, peer frames and beacon directories.

use hostlink_core::network::encode_p2p;
use hostlink_core::{
    BeaconConfig, CandidatePairStats, CandidateType, Coordinates, DeviceInfo, DeviceType,
    MessageBody, P2PMessage, Payload, PeerInfo, ProtocolIds, SignalingMessage,
};

pub const TENANT: &str = "hotel-1";
pub const OTHER_TENANT: &str = "hotel-2";
pub const BEACON_UUID: &str = "F7826DA6-4FA2-4E98-8024-BC5B71E0893E";

pub fn device(name: &str) -> DeviceInfo {
    DeviceInfo::new(DeviceType::Staff, name).with_capability("orders")
}

pub fn join(peer_id: &str, tenant_id: &str) -> SignalingMessage {
    SignalingMessage::Join {
        peer_id: peer_id.to_string(),
        tenant_id: tenant_id.to_string(),
        timestamp: 1,
        device_info: device(peer_id),
    }
}

pub fn leave(peer_id: &str) -> SignalingMessage {
    SignalingMessage::Leave {
        peer_id: peer_id.to_string(),
        tenant_id: TENANT.to_string(),
        timestamp: 2,
    }
}

pub fn peers_list(peers: &[(&str, &str)]) -> SignalingMessage {
    SignalingMessage::PeersList {
        peer_id: "server".to_string(),
        tenant_id: TENANT.to_string(),
        timestamp: 1,
        peers: peers
            .iter()
            .map(|(id, tenant)| PeerInfo::new(id, tenant, device(id)))
            .collect(),
    }
}

pub fn offer(from: &str, to: &str) -> SignalingMessage {
    SignalingMessage::Offer {
        peer_id: from.to_string(),
        tenant_id: TENANT.to_string(),
        target_peer_id: to.to_string(),
        timestamp: 3,
        sdp: format!("v=0 mock-offer {}", to),
    }
}

pub fn answer(from: &str, to: &str) -> SignalingMessage {
    SignalingMessage::Answer {
        peer_id: from.to_string(),
        tenant_id: TENANT.to_string(),
        target_peer_id: to.to_string(),
        timestamp: 4,
        sdp: format!("v=0 mock-answer {}", to),
    }
}

pub fn order(id: &str) -> MessageBody {
    MessageBody::Order {
        order: Payload::new(id).with_field("item", "club sandwich"),
    }
}

/// Encoded data-channel frame as `sender` would send it.
pub fn frame(sender: &str, timestamp: u64, body: MessageBody) -> String {
    let message = P2PMessage::new(TENANT, sender, timestamp, body);
    encode_p2p(&message).unwrap()
}

pub fn host_pair() -> CandidatePairStats {
    CandidatePairStats {
        local_candidate_type: CandidateType::Host,
        remote_candidate_type: CandidateType::Host,
        round_trip_time_ms: Some(2.0),
        bytes_sent: 2_048,
        bytes_received: 1_024,
    }
}

pub fn relay_pair(bytes_sent: u64, bytes_received: u64) -> CandidatePairStats {
    CandidatePairStats {
        local_candidate_type: CandidateType::Relay,
        remote_candidate_type: CandidateType::Host,
        round_trip_time_ms: None,
        bytes_sent,
        bytes_received,
    }
}

pub fn ibeacon(minor: u16) -> ProtocolIds {
    ProtocolIds::ibeacon(BEACON_UUID, 100, minor)
}

/// Beacon `minor` in `zone`, calibrated at -59 dBm.
pub fn beacon(minor: u16, zone: &str) -> BeaconConfig {
    BeaconConfig::new(ibeacon(minor), zone, -59.0)
        .with_area(&format!("{}-{}", zone, minor))
        .with_coordinates(Coordinates {
            x: f64::from(minor),
            y: 0.0,
            floor: Some(0),
        })
}

pub fn directory() -> Vec<BeaconConfig> {
    vec![
        beacon(1, "lobby"),
        beacon(2, "restaurant"),
        beacon(3, "restaurant"),
        beacon(4, "spa"),
    ]
}
