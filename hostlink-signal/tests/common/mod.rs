//! Shared Test Utilities
//!
//! In-memory client sinks and a signaling transport wired straight into a
//! [`Coordinator`].

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hostlink_core::network::{
    decode_signaling, encode_signaling, ConnectionState, TransportResult,
};
use hostlink_core::{
    DeviceInfo, DeviceType, NetworkError, SignalingMessage, SignalingTransport,
};
use hostlink_signal::{ClientSink, ConnectionId, Coordinator};

pub const TENANT: &str = "hotel-1";
pub const OTHER_TENANT: &str = "hotel-2";
pub const MAX_SIZE: usize = 65_536;

/// Client sink that queues frames for inspection.
#[derive(Clone, Default)]
pub struct QueueSink {
    frames: Arc<Mutex<VecDeque<String>>>,
    closed: Arc<AtomicBool>,
}

impl QueueSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and decodes every queued frame.
    pub fn take(&self) -> Vec<SignalingMessage> {
        self.take_raw()
            .iter()
            .map(|text| decode_signaling(text).unwrap())
            .collect()
    }

    pub fn take_raw(&self) -> Vec<String> {
        self.frames.lock().unwrap().drain(..).collect()
    }

    pub fn pop(&self) -> Option<String> {
        self.frames.lock().unwrap().pop_front()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }
}

impl ClientSink for QueueSink {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn send_text(&self, text: &str) -> bool {
        if !self.is_open() {
            return false;
        }
        self.frames.lock().unwrap().push_back(text.to_string());
        true
    }
}

pub fn device(name: &str) -> DeviceInfo {
    DeviceInfo::new(DeviceType::Staff, name)
}

pub fn join_text(peer_id: &str, tenant_id: &str) -> String {
    encode_signaling(&SignalingMessage::Join {
        peer_id: peer_id.to_string(),
        tenant_id: tenant_id.to_string(),
        timestamp: 1,
        device_info: device(peer_id),
    })
    .unwrap()
}

pub fn leave_text(peer_id: &str, tenant_id: &str) -> String {
    encode_signaling(&SignalingMessage::Leave {
        peer_id: peer_id.to_string(),
        tenant_id: tenant_id.to_string(),
        timestamp: 2,
    })
    .unwrap()
}

pub fn offer_text(from: &str, tenant_id: &str, to: &str) -> String {
    encode_signaling(&SignalingMessage::Offer {
        peer_id: from.to_string(),
        tenant_id: tenant_id.to_string(),
        target_peer_id: to.to_string(),
        timestamp: 3,
        sdp: format!("v=0 offer {}->{}", from, to),
    })
    .unwrap()
}

/// Attaches a fresh connection and joins `peer_id` on it.
pub fn joined(
    coordinator: &mut Coordinator,
    peer_id: &str,
    tenant_id: &str,
) -> (ConnectionId, QueueSink) {
    let sink = QueueSink::new();
    let conn = coordinator.attach(Box::new(sink.clone()));
    coordinator.handle_text(conn, &join_text(peer_id, tenant_id), 0);
    (conn, sink)
}

/// Signaling transport linked in-process to a shared coordinator.
#[derive(Clone)]
pub struct CoordinatorLink {
    coordinator: Arc<Mutex<Coordinator>>,
    connection: Arc<Mutex<Option<ConnectionId>>>,
    sink: QueueSink,
}

impl CoordinatorLink {
    pub fn new(coordinator: Arc<Mutex<Coordinator>>) -> Self {
        CoordinatorLink {
            coordinator,
            connection: Arc::new(Mutex::new(None)),
            sink: QueueSink::new(),
        }
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        *self.connection.lock().unwrap()
    }
}

impl SignalingTransport for CoordinatorLink {
    fn connect(&mut self, _url: &str, _timeout: Duration) -> TransportResult<()> {
        let mut connection = self.connection.lock().unwrap();
        if connection.is_none() {
            self.sink.reopen();
            let id = self
                .coordinator
                .lock()
                .unwrap()
                .attach(Box::new(self.sink.clone()));
            *connection = Some(id);
        }
        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(id) = self.connection.lock().unwrap().take() {
            self.sink.close();
            self.coordinator.lock().unwrap().detach(id, 0);
        }
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        if self.connection().is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn send(&mut self, message: &SignalingMessage) -> TransportResult<()> {
        let id = self.connection().ok_or(NetworkError::NotConnected)?;
        let text = encode_signaling(message)?;
        self.coordinator.lock().unwrap().handle_text(id, &text, 0);
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<SignalingMessage>> {
        match self.sink.pop() {
            Some(text) => decode_signaling(&text).map(Some),
            None => Ok(None),
        }
    }
}
