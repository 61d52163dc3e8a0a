// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Test Helpers
//!
//! A connection manager wired to mock transports, plus event recorders.

use std::sync::{Arc, Mutex};

use hostlink_core::{
    CallbackHandler, EventHandler, ManualClock, MockPeerTransportFactory, MockSignalingTransport,
    PeerEvent, PeerManager, PeerManagerConfig, PeerTransportEvent, TransportState,
};

use super::fixtures::{answer, device, join, offer, TENANT};

pub const PRIMARY: &str = "ws://signal-primary.local:8080";
pub const BACKUP: &str = "ws://signal-backup.local:8080";
pub const START_MS: u64 = 1_000_000;

pub type MockManager = PeerManager<MockSignalingTransport, MockPeerTransportFactory>;

/// Records every event passed to it.
pub struct Recorder<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone + Send + 'static> Recorder<E> {
    pub fn new() -> Self {
        Recorder {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handler(&self) -> Arc<dyn EventHandler<E>> {
        let events = Arc::clone(&self.events);
        Arc::new(CallbackHandler::new(move |event: E| {
            events.lock().unwrap().push(event)
        }))
    }

    pub fn events(&self) -> Vec<E> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// A manager plus handles onto its mocks.
pub struct TestPeer {
    pub manager: MockManager,
    pub signaling: MockSignalingTransport,
    pub factory: MockPeerTransportFactory,
    pub clock: ManualClock,
    pub recorder: Recorder<PeerEvent>,
}

/// Creates an unconnected manager for `peer_id` in the test tenant.
pub fn new_peer(peer_id: &str) -> TestPeer {
    let signaling = MockSignalingTransport::new();
    let factory = MockPeerTransportFactory::new();
    let clock = ManualClock::new(START_MS);
    let recorder = Recorder::new();

    let config = PeerManagerConfig::new(TENANT, device(peer_id))
        .with_peer_id(peer_id)
        .with_signaling_server(PRIMARY)
        .with_signaling_server(BACKUP);

    let mut manager = PeerManager::new(config, signaling.clone(), factory.clone())
        .with_clock(Arc::new(clock.clone()));
    manager.add_event_handler(recorder.handler());

    TestPeer {
        manager,
        signaling,
        factory,
        clock,
        recorder,
    }
}

/// Creates a manager for `peer_id` already joined to signaling.
pub fn connected_peer(peer_id: &str) -> TestPeer {
    let mut peer = new_peer(peer_id);
    peer.manager.connect().unwrap();
    peer.signaling.clear_sent();
    peer
}

impl TestPeer {
    /// Drives negotiation with `remote` until its channel is open.
    pub fn open_link(&mut self, remote: &str) {
        self.manager.handle_signaling_message(join(remote, TENANT));

        let local = self.manager.peer_id().to_string();
        if local.as_str() < remote {
            self.manager.handle_signaling_message(answer(remote, &local));
        } else {
            self.manager.handle_signaling_message(offer(remote, &local));
        }

        self.manager
            .handle_transport_event(remote, PeerTransportEvent::StateChanged(TransportState::Connected));
        self.manager
            .handle_transport_event(remote, PeerTransportEvent::ChannelOpen);
    }

    /// Delivers a data-channel frame from `remote`.
    pub fn receive_frame(&mut self, remote: &str, frame: String) {
        self.manager
            .handle_transport_event(remote, PeerTransportEvent::ChannelMessage(frame));
    }
}
