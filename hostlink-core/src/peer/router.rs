// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Message Router
//!
//! Typed dispatch of inbound peer messages. Each message reaches the one
//! handler registered for its kind plus every generic handler. `ping` and
//! `pong` additionally produce an action for the connection manager.

use std::collections::HashMap;
use std::sync::Arc;

use crate::network::{MessageBody, MessageKind, P2PMessage};
use crate::types::PeerId;

/// Receives routed messages.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &P2PMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(&P2PMessage) + Send + Sync,
{
    fn handle(&self, message: &P2PMessage) {
        self(message)
    }
}

/// Follow-up the connection manager performs after routing.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteAction {
    None,
    /// Answer a ping.
    ReplyPong { to: PeerId, ping_timestamp: u64 },
    /// Store a measured round trip.
    RecordLatency { peer_id: PeerId, latency_ms: u64 },
}

/// Dispatches messages by kind.
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<MessageKind, Arc<dyn MessageHandler>>,
    generic: Vec<Arc<dyn MessageHandler>>,
}

impl MessageRouter {
    /// Creates a router with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for a kind, returning the one it replaces.
    pub fn on(
        &mut self,
        kind: MessageKind,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.insert(kind, handler)
    }

    /// Removes the handler for a kind.
    pub fn off(&mut self, kind: MessageKind) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.remove(&kind)
    }

    /// Adds a handler that sees every message.
    pub fn on_message(&mut self, handler: Arc<dyn MessageHandler>) {
        self.generic.push(handler);
    }

    /// Returns true if a handler is registered for the kind.
    pub fn has_handler(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Routes one message received at `now_ms`.
    pub fn dispatch(&self, message: &P2PMessage, now_ms: u64) -> RouteAction {
        if let Some(handler) = self.handlers.get(&message.kind()) {
            handler.handle(message);
        }
        for handler in &self.generic {
            handler.handle(message);
        }

        match &message.body {
            MessageBody::Ping => RouteAction::ReplyPong {
                to: message.sender_id.clone(),
                ping_timestamp: message.timestamp,
            },
            MessageBody::Pong { ping_timestamp } => {
                let sent_at = ping_timestamp.unwrap_or(message.timestamp);
                RouteAction::RecordLatency {
                    peer_id: message.sender_id.clone(),
                    latency_ms: now_ms.saturating_sub(sent_at),
                }
            }
            _ => RouteAction::None,
        }
    }
}
