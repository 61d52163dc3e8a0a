// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mock Transports
//!
//! In-memory implementations of the transport traits for testing.
//! Clones share state, so a test keeps one handle while the manager owns
//! another.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::error::NetworkError;
use super::protocol::decode_signaling;
use super::signaling::{IceCandidate, SignalingMessage};
use super::transport::{
    CandidatePairStats, ConnectionState, IceServer, PeerTransport, PeerTransportFactory,
    SignalingTransport, TransportResult,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug)]
struct SignalingState {
    state: ConnectionState,
    connected_url: Option<String>,
    unreachable: HashSet<String>,
    connect_attempts: Vec<String>,
    sent: Vec<SignalingMessage>,
    receive_queue: VecDeque<String>,
    inject_error: Option<NetworkError>,
}

/// Mock signaling transport.
///
/// Allows injection of inbound frames and unreachable servers, and tracking
/// of sent messages.
///
/// # Example
///
/// ```ignore
/// use hostlink_core::network::{MockSignalingTransport, SignalingTransport};
///
/// let mut transport = MockSignalingTransport::new();
/// transport.set_unreachable("ws://primary:8080");
/// transport.connect("ws://backup:8080", Duration::from_secs(5))?;
///
/// // Queue a frame to be returned by receive()
/// transport.queue_text(r#"{"type":"leave",...}"#);
/// ```
#[derive(Debug, Clone)]
pub struct MockSignalingTransport {
    inner: Arc<Mutex<SignalingState>>,
}

impl Default for MockSignalingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSignalingTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        MockSignalingTransport {
            inner: Arc::new(Mutex::new(SignalingState {
                state: ConnectionState::Disconnected,
                connected_url: None,
                unreachable: HashSet::new(),
                connect_attempts: Vec::new(),
                sent: Vec::new(),
                receive_queue: VecDeque::new(),
                inject_error: None,
            })),
        }
    }

    /// Makes `connect` to this URL time out.
    pub fn set_unreachable(&self, url: &str) {
        lock(&self.inner).unreachable.insert(url.to_string());
    }

    /// Makes a previously unreachable URL reachable again.
    pub fn set_reachable(&self, url: &str) {
        lock(&self.inner).unreachable.remove(url);
    }

    /// Queues a message to be returned by the next receive() call.
    pub fn queue_receive(&self, message: &SignalingMessage) {
        if let Ok(text) = serde_json::to_string(message) {
            self.queue_text(&text);
        }
    }

    /// Queues a raw text frame (may be malformed).
    pub fn queue_text(&self, text: &str) {
        lock(&self.inner).receive_queue.push_back(text.to_string());
    }

    /// Returns all messages that have been sent.
    pub fn sent_messages(&self) -> Vec<SignalingMessage> {
        lock(&self.inner).sent.clone()
    }

    /// Clears the sent messages buffer.
    pub fn clear_sent(&self) {
        lock(&self.inner).sent.clear();
    }

    /// URLs passed to `connect`, in order.
    pub fn connect_attempts(&self) -> Vec<String> {
        lock(&self.inner).connect_attempts.clone()
    }

    /// URL of the current connection.
    pub fn connected_url(&self) -> Option<String> {
        lock(&self.inner).connected_url.clone()
    }

    /// Injects an error to be returned on the next operation.
    pub fn inject_error(&self, error: NetworkError) {
        lock(&self.inner).inject_error = Some(error);
    }

    /// Simulates the server dropping the link.
    pub fn drop_link(&self) {
        let mut inner = lock(&self.inner);
        inner.state = ConnectionState::Disconnected;
        inner.connected_url = None;
    }
}

impl SignalingState {
    fn check_error(&mut self) -> TransportResult<()> {
        if let Some(err) = self.inject_error.take() {
            return Err(err);
        }
        Ok(())
    }
}

impl SignalingTransport for MockSignalingTransport {
    fn connect(&mut self, url: &str, _timeout: Duration) -> TransportResult<()> {
        let mut inner = lock(&self.inner);
        inner.check_error()?;
        inner.connect_attempts.push(url.to_string());

        if inner.unreachable.contains(url) {
            inner.state = ConnectionState::Disconnected;
            return Err(NetworkError::Timeout);
        }

        inner.state = ConnectionState::Connected;
        inner.connected_url = Some(url.to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        let mut inner = lock(&self.inner);
        inner.state = ConnectionState::Disconnected;
        inner.connected_url = None;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        lock(&self.inner).state
    }

    fn send(&mut self, message: &SignalingMessage) -> TransportResult<()> {
        let mut inner = lock(&self.inner);
        inner.check_error()?;

        if inner.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }

        inner.sent.push(message.clone());
        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<SignalingMessage>> {
        let mut inner = lock(&self.inner);
        inner.check_error()?;

        if inner.state != ConnectionState::Connected {
            return Err(NetworkError::NotConnected);
        }

        match inner.receive_queue.pop_front() {
            Some(text) => decode_signaling(&text).map(Some),
            None => Ok(None),
        }
    }
}

/// Observable state of one mock peer primitive.
#[derive(Debug, Clone, Default)]
pub struct MockPeerState {
    /// Remote peer this primitive was created for.
    pub remote_peer_id: String,
    /// Label and ordering of the locally created data channel.
    pub data_channel: Option<(String, bool)>,
    pub local_description: Option<String>,
    pub remote_description: Option<String>,
    /// Remote candidates added.
    pub remote_candidates: Vec<IceCandidate>,
    /// Frames written to the data channel.
    pub sent: Vec<String>,
    /// Reported by `selected_candidate_pair`.
    pub candidate_pair: Option<CandidatePairStats>,
    pub closed: bool,
    /// Makes offer/answer application fail.
    pub fail_negotiation: bool,
}

/// Mock peer primitive backed by a shared [`MockPeerState`].
#[derive(Debug, Clone)]
pub struct MockPeerTransport {
    state: Arc<Mutex<MockPeerState>>,
}

impl MockPeerTransport {
    /// Returns a snapshot of the primitive's state.
    pub fn snapshot(&self) -> MockPeerState {
        lock(&self.state).clone()
    }
}

impl PeerTransport for MockPeerTransport {
    fn create_data_channel(&mut self, label: &str, ordered: bool) -> TransportResult<()> {
        lock(&self.state).data_channel = Some((label.to_string(), ordered));
        Ok(())
    }

    fn create_offer(&mut self) -> TransportResult<String> {
        let mut state = lock(&self.state);
        if state.fail_negotiation {
            return Err(NetworkError::NegotiationFailed("offer rejected".into()));
        }
        let sdp = format!("v=0 mock-offer {}", state.remote_peer_id);
        state.local_description = Some(sdp.clone());
        Ok(sdp)
    }

    fn accept_offer(&mut self, sdp: &str) -> TransportResult<String> {
        let mut state = lock(&self.state);
        if state.fail_negotiation {
            return Err(NetworkError::NegotiationFailed("offer rejected".into()));
        }
        state.remote_description = Some(sdp.to_string());
        let answer = format!("v=0 mock-answer {}", state.remote_peer_id);
        state.local_description = Some(answer.clone());
        Ok(answer)
    }

    fn accept_answer(&mut self, sdp: &str) -> TransportResult<()> {
        let mut state = lock(&self.state);
        if state.fail_negotiation {
            return Err(NetworkError::NegotiationFailed("answer rejected".into()));
        }
        state.remote_description = Some(sdp.to_string());
        Ok(())
    }

    fn add_ice_candidate(&mut self, candidate: &IceCandidate) -> TransportResult<()> {
        lock(&self.state).remote_candidates.push(candidate.clone());
        Ok(())
    }

    fn send(&mut self, data: &str) -> TransportResult<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(NetworkError::ConnectionClosed);
        }
        state.sent.push(data.to_string());
        Ok(())
    }

    fn selected_candidate_pair(&self) -> Option<CandidatePairStats> {
        lock(&self.state).candidate_pair.clone()
    }

    fn close(&mut self) {
        lock(&self.state).closed = true;
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    links: HashMap<String, Arc<Mutex<MockPeerState>>>,
    created: usize,
    fail_create: bool,
    default_pair: Option<CandidatePairStats>,
    fail_negotiation: HashSet<String>,
}

/// Factory for [`MockPeerTransport`]s.
///
/// Keeps the latest primitive per remote peer so tests can inspect what
/// the manager sent and feed back transport events.
#[derive(Debug, Clone, Default)]
pub struct MockPeerTransportFactory {
    inner: Arc<Mutex<FactoryState>>,
}

impl MockPeerTransportFactory {
    /// Creates a new factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate pair reported by primitives created from now on.
    pub fn set_default_candidate_pair(&self, pair: CandidatePairStats) {
        lock(&self.inner).default_pair = Some(pair);
    }

    /// Makes `create` fail.
    pub fn set_fail_create(&self, fail: bool) {
        lock(&self.inner).fail_create = fail;
    }

    /// Makes negotiation fail for primitives created for this peer.
    pub fn fail_negotiation_with(&self, remote_peer_id: &str) {
        lock(&self.inner)
            .fail_negotiation
            .insert(remote_peer_id.to_string());
    }

    /// Number of primitives created so far.
    pub fn created_count(&self) -> usize {
        lock(&self.inner).created
    }

    /// Snapshot of the latest primitive for a remote peer.
    pub fn peer(&self, remote_peer_id: &str) -> Option<MockPeerState> {
        lock(&self.inner)
            .links
            .get(remote_peer_id)
            .map(|state| lock(state).clone())
    }

    /// Removes and returns frames written to a remote peer so far.
    pub fn take_sent(&self, remote_peer_id: &str) -> Vec<String> {
        lock(&self.inner)
            .links
            .get(remote_peer_id)
            .map(|state| std::mem::take(&mut lock(state).sent))
            .unwrap_or_default()
    }

    /// Overrides the candidate pair of an existing primitive.
    pub fn set_candidate_pair(&self, remote_peer_id: &str, pair: CandidatePairStats) {
        if let Some(state) = lock(&self.inner).links.get(remote_peer_id) {
            lock(state).candidate_pair = Some(pair);
        }
    }
}

impl PeerTransportFactory for MockPeerTransportFactory {
    type Transport = MockPeerTransport;

    fn create(
        &mut self,
        remote_peer_id: &str,
        _ice_servers: &[IceServer],
    ) -> TransportResult<MockPeerTransport> {
        let mut inner = lock(&self.inner);
        if inner.fail_create {
            return Err(NetworkError::ConnectionFailed("mock create failure".into()));
        }

        let state = Arc::new(Mutex::new(MockPeerState {
            remote_peer_id: remote_peer_id.to_string(),
            candidate_pair: inner.default_pair.clone(),
            fail_negotiation: inner.fail_negotiation.contains(remote_peer_id),
            ..Default::default()
        }));
        inner
            .links
            .insert(remote_peer_id.to_string(), Arc::clone(&state));
        inner.created += 1;

        Ok(MockPeerTransport { state })
    }
}
