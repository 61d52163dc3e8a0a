// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for peer::manager

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::fixtures::*;
use common::helpers::*;
use hostlink_core::network::decode_p2p;
use hostlink_core::{
    DisconnectReason, IceCandidate, MessageBody, MessageHandler, MessageKind, P2PMessage,
    PeerConnectionState, PeerError, PeerEvent, PeerTransportEvent, SignalingMessage,
    TopologyKind, TransportState,
};

fn sent_offers(peer: &TestPeer) -> Vec<String> {
    peer.signaling
        .sent_messages()
        .into_iter()
        .filter_map(|m| match m {
            SignalingMessage::Offer { target_peer_id, .. } => Some(target_peer_id),
            _ => None,
        })
        .collect()
}

fn counter() -> (Arc<AtomicUsize>, Arc<dyn MessageHandler>) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&count);
    let handler: Arc<dyn MessageHandler> = Arc::new(move |_: &P2PMessage| {
        handle.fetch_add(1, Ordering::SeqCst);
    });
    (count, handler)
}

// ============================================================
// Connect
// ============================================================

#[test]
fn test_connect_uses_first_reachable_server() {
    let mut peer = new_peer("a");

    let server = peer.manager.connect().unwrap();

    assert_eq!(server, PRIMARY);
    assert_eq!(peer.signaling.connect_attempts(), vec![PRIMARY.to_string()]);
    assert!(peer.manager.is_signaling_connected());
}

#[test]
fn test_connect_fails_over_in_priority_order() {
    let mut peer = new_peer("a");
    peer.signaling.set_unreachable(PRIMARY);

    let server = peer.manager.connect().unwrap();

    assert_eq!(server, BACKUP);
    assert_eq!(
        peer.signaling.connect_attempts(),
        vec![PRIMARY.to_string(), BACKUP.to_string()]
    );
    assert_eq!(peer.manager.signaling_server(), Some(BACKUP));
}

#[test]
fn test_connect_sends_join_with_device_info() {
    let mut peer = new_peer("a");
    peer.manager.connect().unwrap();

    let sent = peer.signaling.sent_messages();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        SignalingMessage::Join {
            peer_id,
            tenant_id,
            device_info,
            ..
        } => {
            assert_eq!(peer_id, "a");
            assert_eq!(tenant_id, TENANT);
            assert!(device_info.has_capability("orders"));
        }
        other => panic!("Expected join, got {:?}", other),
    }
}

#[test]
fn test_connect_all_servers_down_is_signaling_unavailable() {
    let mut peer = new_peer("a");
    peer.signaling.set_unreachable(PRIMARY);
    peer.signaling.set_unreachable(BACKUP);

    let err = peer.manager.connect().unwrap_err();

    match err {
        PeerError::SignalingUnavailable { attempted, .. } => assert_eq!(attempted, 2),
        other => panic!("Expected SignalingUnavailable, got {:?}", other),
    }
    assert!(!peer.manager.is_signaling_connected());
}

#[test]
fn test_connect_after_disconnect_is_rejected() {
    let mut peer = connected_peer("a");
    peer.manager.disconnect();

    assert_eq!(peer.manager.connect().unwrap_err(), PeerError::Closed);
}

// ============================================================
// Peer Discovery
// ============================================================

#[test]
fn test_peers_list_tracks_tenant_peers_and_skips_self() {
    let mut peer = connected_peer("b");

    peer.manager.handle_signaling_message(peers_list(&[
        ("a", TENANT),
        ("b", TENANT),
        ("c", TENANT),
        ("x", OTHER_TENANT),
    ]));

    let mut ids: Vec<String> = peer.manager.peers().map(|p| p.peer_id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn test_smaller_id_initiates_with_ordered_channel() {
    let mut peer = connected_peer("b");

    peer.manager
        .handle_signaling_message(peers_list(&[("a", TENANT), ("c", TENANT)]));

    assert_eq!(sent_offers(&peer), vec!["c".to_string()]);
    assert_eq!(peer.manager.peer_state("a"), Some(PeerConnectionState::New));
    assert_eq!(
        peer.manager.peer_state("c"),
        Some(PeerConnectionState::Connecting)
    );

    let link = peer.factory.peer("c").unwrap();
    assert_eq!(link.data_channel, Some(("hostlink".to_string(), true)));
    assert!(peer.factory.peer("a").is_none());
}

#[test]
fn test_duplicate_join_does_not_renegotiate() {
    let mut peer = connected_peer("a");

    peer.manager.handle_signaling_message(join("b", TENANT));
    peer.manager.handle_signaling_message(join("b", TENANT));

    assert_eq!(peer.factory.created_count(), 1);
    assert_eq!(sent_offers(&peer).len(), 1);
}

#[test]
fn test_foreign_tenant_signaling_is_ignored() {
    let mut peer = connected_peer("a");

    peer.manager.handle_signaling_message(join("b", OTHER_TENANT));

    assert!(peer.manager.peer("b").is_none());
    assert_eq!(peer.factory.created_count(), 0);
}

// ============================================================
// Negotiation
// ============================================================

#[test]
fn test_inbound_offer_is_answered() {
    let mut peer = connected_peer("b");

    peer.manager.handle_signaling_message(offer("a", "b"));

    let sent = peer.signaling.sent_messages();
    assert!(sent.iter().any(|m| matches!(
        m,
        SignalingMessage::Answer { target_peer_id, sdp, .. }
            if target_peer_id == "a" && sdp == "v=0 mock-answer a"
    )));
    assert_eq!(
        peer.manager.peer_state("a"),
        Some(PeerConnectionState::Connecting)
    );
}

#[test]
fn test_offer_for_other_peer_is_ignored() {
    let mut peer = connected_peer("b");

    peer.manager.handle_signaling_message(offer("a", "z"));

    assert_eq!(peer.factory.created_count(), 0);
    assert!(peer.signaling.sent_messages().is_empty());
}

#[test]
fn test_colliding_offer_ignored_by_initiator() {
    let mut peer = connected_peer("a");
    peer.manager.handle_signaling_message(join("b", TENANT));
    peer.signaling.clear_sent();

    peer.manager.handle_signaling_message(offer("b", "a"));

    assert!(peer.signaling.sent_messages().is_empty());
    assert_eq!(peer.factory.created_count(), 1);
}

#[test]
fn test_repeated_offer_replaces_passive_link() {
    let mut peer = connected_peer("b");

    peer.manager.handle_signaling_message(offer("a", "b"));
    peer.manager.handle_signaling_message(offer("a", "b"));

    assert_eq!(peer.factory.created_count(), 2);
    assert_eq!(peer.manager.peers().count(), 1);
}

#[test]
fn test_answer_applied_to_pending_offer() {
    let mut peer = connected_peer("a");
    peer.manager.handle_signaling_message(join("b", TENANT));

    peer.manager.handle_signaling_message(answer("b", "a"));

    let link = peer.factory.peer("b").unwrap();
    assert_eq!(link.remote_description.as_deref(), Some("v=0 mock-answer a"));
}

#[test]
fn test_local_candidates_forwarded_to_remote() {
    let mut peer = connected_peer("a");
    peer.manager.handle_signaling_message(join("b", TENANT));
    peer.signaling.clear_sent();

    let candidate = IceCandidate::new("candidate:1 1 udp 2122260223 10.0.0.5 54321 typ host");
    peer.manager
        .handle_transport_event("b", PeerTransportEvent::IceCandidate(candidate.clone()));

    let sent = peer.signaling.sent_messages();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        &sent[0],
        SignalingMessage::IceCandidate { target_peer_id, candidate: c, .. }
            if target_peer_id == "b" && *c == candidate
    ));
}

#[test]
fn test_remote_candidates_applied() {
    let mut peer = connected_peer("a");
    peer.manager.handle_signaling_message(join("b", TENANT));

    peer.manager
        .handle_signaling_message(SignalingMessage::IceCandidate {
            peer_id: "b".into(),
            tenant_id: TENANT.into(),
            target_peer_id: "a".into(),
            timestamp: 5,
            candidate: IceCandidate::new("candidate:2 1 udp 1 10.0.0.6 5000 typ host"),
        });

    assert_eq!(peer.factory.peer("b").unwrap().remote_candidates.len(), 1);
}

#[test]
fn test_negotiation_failure_reports_disconnected() {
    let mut peer = connected_peer("a");
    peer.factory.fail_negotiation_with("b");

    peer.manager.handle_signaling_message(join("b", TENANT));

    assert!(sent_offers(&peer).is_empty());
    assert!(peer.manager.peer("b").is_none());
    assert!(peer.recorder.events().contains(&PeerEvent::Disconnected {
        peer_id: "b".into(),
        reason: DisconnectReason::Failed,
    }));
}

// ============================================================
// Connection State
// ============================================================

#[test]
fn test_connected_emits_connected_then_topology() {
    let mut peer = connected_peer("a");
    peer.factory.set_default_candidate_pair(host_pair());

    peer.open_link("b");

    let events = peer.recorder.events();
    assert!(matches!(&events[0], PeerEvent::Connected { peer_id, .. } if peer_id == "b"));
    match &events[1] {
        PeerEvent::TopologyDetected { peer_id, topology } => {
            assert_eq!(peer_id, "b");
            assert_eq!(topology.kind, TopologyKind::LocalDirect);
            assert_eq!(topology.estimated_cost, 0.0);
        }
        other => panic!("Expected topology, got {:?}", other),
    }

    let info = peer.manager.peer("b").unwrap();
    assert_eq!(info.connection_state, PeerConnectionState::Connected);
    assert_eq!(info.connected_at, START_MS);
    assert_eq!(peer.manager.connected_peers(), vec!["b".to_string()]);
}

#[test]
fn test_connected_without_stats_skips_topology() {
    let mut peer = connected_peer("a");

    peer.open_link("b");

    let events = peer.recorder.events();
    assert_eq!(events.len(), 1);
    assert!(peer.manager.network_topology("b").is_none());
}

#[test]
fn test_relayed_topology_has_cost() {
    let mut peer = connected_peer("a");
    peer.open_link("b");

    peer.factory.set_candidate_pair("b", relay_pair(1 << 30, 0));
    let topology = peer.manager.network_topology("b").unwrap();

    assert_eq!(topology.kind, TopologyKind::Relayed);
    assert!((topology.estimated_cost - 0.40).abs() < 1e-9);
}

#[test]
fn test_remote_close_removes_peer() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.recorder.clear();

    peer.manager.handle_transport_event(
        "b",
        PeerTransportEvent::StateChanged(TransportState::Disconnected),
    );

    assert!(peer.manager.peer("b").is_none());
    assert!(peer.manager.connected_peers().is_empty());
    assert_eq!(
        peer.recorder.events(),
        vec![PeerEvent::Disconnected {
            peer_id: "b".into(),
            reason: DisconnectReason::Disconnected,
        }]
    );
}

#[test]
fn test_transport_failure_removes_peer_as_failed() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.recorder.clear();

    peer.manager
        .handle_transport_event("b", PeerTransportEvent::StateChanged(TransportState::Failed));

    let events = peer.recorder.events();
    assert!(events.contains(&PeerEvent::Disconnected {
        peer_id: "b".into(),
        reason: DisconnectReason::Failed,
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, PeerEvent::Error { peer_id: Some(id), .. } if id == "b")));
    assert!(peer.factory.peer("b").unwrap().closed);
}

#[test]
fn test_leave_removes_peer_and_closes_transport() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.recorder.clear();

    peer.manager.handle_signaling_message(leave("b"));

    assert!(peer.manager.peer("b").is_none());
    assert!(peer.factory.peer("b").unwrap().closed);
    assert_eq!(
        peer.recorder.events(),
        vec![PeerEvent::Disconnected {
            peer_id: "b".into(),
            reason: DisconnectReason::Left,
        }]
    );
}

#[test]
fn test_rejoin_after_leave_renegotiates() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.manager.handle_signaling_message(leave("b"));

    peer.manager.handle_signaling_message(join("b", TENANT));

    assert_eq!(peer.factory.created_count(), 2);
    assert_eq!(
        peer.manager.peer_state("b"),
        Some(PeerConnectionState::Connecting)
    );
}

// ============================================================
// Send
// ============================================================

#[test]
fn test_broadcast_reaches_only_open_channels() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.open_link("c");
    peer.manager.handle_signaling_message(join("d", TENANT));

    let outcome = peer.manager.send(order("o1"), None);

    let mut delivered = outcome.delivered_to.clone();
    delivered.sort();
    assert_eq!(delivered, vec!["b".to_string(), "c".to_string()]);
    assert_eq!(peer.factory.take_sent("b").len(), 1);
    assert_eq!(peer.factory.take_sent("c").len(), 1);
    assert!(peer.factory.take_sent("d").is_empty());
}

#[test]
fn test_unicast_reaches_only_target() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.open_link("c");

    let outcome = peer.manager.send(order("o1"), Some("c"));

    assert_eq!(outcome.delivered_to, vec!["c".to_string()]);
    assert!(peer.factory.take_sent("b").is_empty());
}

#[test]
fn test_send_to_unopened_channel_is_noop() {
    let mut peer = connected_peer("a");
    peer.manager.handle_signaling_message(join("b", TENANT));

    let outcome = peer.manager.send(order("o1"), Some("b"));
    assert!(outcome.delivered_to.is_empty());

    let outcome = peer.manager.send(order("o2"), Some("unknown"));
    assert!(outcome.delivered_to.is_empty());
}

#[test]
fn test_send_after_channel_closed_is_noop() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.manager
        .handle_transport_event("b", PeerTransportEvent::ChannelClosed);

    let outcome = peer.manager.send(order("o1"), None);

    assert!(outcome.delivered_to.is_empty());
}

#[test]
fn test_send_stamps_envelope() {
    let mut peer = connected_peer("a");
    peer.open_link("b");

    let outcome = peer.manager.send(order("o1"), Some("b"));
    let frames = peer.factory.take_sent("b");
    let message = decode_p2p(&frames[0]).unwrap();

    assert_eq!(message.message_id, outcome.message_id);
    assert_eq!(message.sender_id, "a");
    assert_eq!(message.tenant_id, TENANT);
    assert_eq!(message.timestamp, START_MS);
    assert_eq!(message.kind(), MessageKind::Order);
}

// ============================================================
// Inbound Messages
// ============================================================

#[test]
fn test_inbound_order_reaches_typed_and_generic_handlers() {
    let mut peer = connected_peer("a");
    let (orders, order_handler) = counter();
    let (all, generic_handler) = counter();
    peer.manager.on(MessageKind::Order, order_handler);
    peer.manager.on_message(generic_handler);
    peer.open_link("b");

    peer.receive_frame("b", frame("b", START_MS, order("o1")));

    assert_eq!(orders.load(Ordering::SeqCst), 1);
    assert_eq!(all.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ping_is_answered_with_pong() {
    let mut peer = connected_peer("a");
    peer.open_link("b");

    peer.receive_frame("b", frame("b", 500, MessageBody::Ping));

    let frames = peer.factory.take_sent("b");
    assert_eq!(frames.len(), 1);
    let pong = decode_p2p(&frames[0]).unwrap();
    assert_eq!(
        pong.body,
        MessageBody::Pong {
            ping_timestamp: Some(500)
        }
    );
}

#[test]
fn test_pong_records_latency() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.manager.send(MessageBody::Ping, Some("b"));

    peer.clock.advance(42);
    peer.receive_frame(
        "b",
        frame(
            "b",
            START_MS + 40,
            MessageBody::Pong {
                ping_timestamp: Some(START_MS),
            },
        ),
    );

    assert_eq!(peer.manager.peer("b").unwrap().latency, Some(42));
}

#[test]
fn test_malformed_frame_is_dropped() {
    let mut peer = connected_peer("a");
    let (all, generic_handler) = counter();
    peer.manager.on_message(generic_handler);
    peer.open_link("b");

    peer.receive_frame("b", "{not json".to_string());
    peer.receive_frame("b", r#"{"type":"teleport","messageId":"m"}"#.to_string());

    assert_eq!(all.load(Ordering::SeqCst), 0);
    assert_eq!(peer.manager.connected_peers(), vec!["b".to_string()]);
}

#[test]
fn test_spoofed_sender_is_dropped() {
    let mut peer = connected_peer("a");
    let (all, generic_handler) = counter();
    peer.manager.on_message(generic_handler);
    peer.open_link("b");

    peer.receive_frame("b", frame("c", START_MS, order("o1")));

    assert_eq!(all.load(Ordering::SeqCst), 0);
}

// ============================================================
// Signaling Input
// ============================================================

#[test]
fn test_poll_skips_malformed_signaling_frames() {
    let mut peer = connected_peer("a");
    peer.signaling.queue_text("{\"type\":\"join\"");
    peer.signaling.queue_receive(&join("b", TENANT));

    let handled = peer.manager.poll_signaling();

    assert_eq!(handled, 1);
    assert!(peer.manager.peer("b").is_some());
}

#[test]
fn test_coordinator_error_is_surfaced() {
    let mut peer = connected_peer("a");

    peer.manager.handle_signaling_message(SignalingMessage::Error {
        message: "malformed message".into(),
        timestamp: 1,
    });

    assert!(matches!(
        &peer.recorder.events()[0],
        PeerEvent::Error { peer_id: None, .. }
    ));
}

// ============================================================
// Timers
// ============================================================

#[test]
fn test_keepalive_pings_open_peers() {
    let mut peer = connected_peer("a");
    peer.open_link("b");

    peer.clock.advance(29_000);
    peer.manager.tick();
    assert!(peer.factory.take_sent("b").is_empty());

    peer.clock.advance(1_000);
    peer.manager.tick();
    let frames = peer.factory.take_sent("b");
    assert_eq!(frames.len(), 1);
    assert_eq!(decode_p2p(&frames[0]).unwrap().kind(), MessageKind::Ping);
}

#[test]
fn test_reconnect_rejoins_after_fixed_interval() {
    let mut peer = connected_peer("a");
    peer.signaling.drop_link();

    peer.manager.tick();
    assert!(!peer.manager.is_signaling_connected());

    peer.clock.advance(4_999);
    peer.manager.tick();
    assert!(!peer.manager.is_signaling_connected());

    peer.clock.advance(1);
    peer.manager.tick();
    assert!(peer.manager.is_signaling_connected());
    assert!(matches!(
        peer.signaling.sent_messages().last(),
        Some(SignalingMessage::Join { .. })
    ));
}

#[test]
fn test_signaling_drop_forgets_peers_until_rejoin() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.recorder.clear();

    peer.signaling.drop_link();
    peer.manager.tick();

    assert!(peer.manager.peers().next().is_none());
    assert!(peer.manager.connected_peers().is_empty());
    assert!(peer.factory.peer("b").unwrap().closed);
    assert!(peer.recorder.events().contains(&PeerEvent::Disconnected {
        peer_id: "b".into(),
        reason: DisconnectReason::Disconnected,
    }));

    // The fresh peers-list entry renegotiates as initiator.
    peer.clock.advance(5_000);
    peer.manager.tick();
    peer.signaling.clear_sent();
    peer.manager.handle_signaling_message(join("b", TENANT));

    assert_eq!(sent_offers(&peer), vec!["b".to_string()]);
    assert_eq!(peer.factory.created_count(), 2);
}

#[test]
fn test_reconnect_keeps_retrying_while_servers_down() {
    let mut peer = connected_peer("a");
    peer.signaling.drop_link();
    peer.signaling.set_unreachable(PRIMARY);
    peer.signaling.set_unreachable(BACKUP);
    peer.manager.tick();

    peer.clock.advance(5_000);
    peer.manager.tick();
    assert!(!peer.manager.is_signaling_connected());

    peer.signaling.set_reachable(BACKUP);
    peer.clock.advance(5_000);
    peer.manager.tick();
    assert_eq!(peer.manager.signaling_server(), Some(BACKUP));
}

// ============================================================
// Disconnect
// ============================================================

#[test]
fn test_disconnect_closes_everything() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.manager.handle_signaling_message(join("c", TENANT));
    peer.recorder.clear();

    peer.manager.disconnect();

    assert!(peer.manager.peers().next().is_none());
    assert!(peer.factory.peer("b").unwrap().closed);
    assert!(peer.factory.peer("c").unwrap().closed);
    assert!(matches!(
        peer.signaling.sent_messages().last(),
        Some(SignalingMessage::Leave { .. })
    ));
    assert!(!peer.manager.is_signaling_connected());

    let events = peer.recorder.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| matches!(
        e,
        PeerEvent::Disconnected {
            reason: DisconnectReason::Closed,
            ..
        }
    )));
}

#[test]
fn test_disconnect_is_idempotent_and_stops_timers() {
    let mut peer = connected_peer("a");
    peer.open_link("b");
    peer.manager.disconnect();
    peer.recorder.clear();

    peer.manager.disconnect();
    peer.clock.advance(60_000);
    peer.manager.tick();
    peer.manager.handle_signaling_message(join("c", TENANT));

    assert!(peer.recorder.events().is_empty());
    assert_eq!(peer.factory.created_count(), 1);
}
