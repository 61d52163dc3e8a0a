// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peer Message Types
//!
//! Application messages carried over the reliable, ordered data channel
//! between two established peers.
//!
//! On the wire the envelope fields and the `type` tag share one flat JSON
//! object:
//!
//! ```text
//! {"messageId":"..","tenantId":"hotel-1","senderId":"..","timestamp":1700000000000,
//!  "type":"order","order":{"id":"o1","table":"5"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{MessageId, PeerId, TenantId};

/// Application payload with a required id and free-form fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Payload {
    /// Creates a payload with only an id.
    pub fn new(id: &str) -> Self {
        Payload {
            id: id.to_string(),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Reads a string field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Message kinds, one per body variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Order,
    Print,
    Notification,
    RoomAssignment,
    IotCommand,
    Ping,
    Pong,
    Message,
}

impl MessageKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Order => "order",
            MessageKind::Print => "print",
            MessageKind::Notification => "notification",
            MessageKind::RoomAssignment => "room-assignment",
            MessageKind::IotCommand => "iot-command",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::Message => "message",
        }
    }
}

/// Typed message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum MessageBody {
    /// Food or service order.
    Order { order: Payload },
    /// Print job for a receipt or kitchen printer.
    Print { job: Payload },
    /// Staff or guest notification.
    Notification { notification: Payload },
    /// Room allocated to a guest.
    RoomAssignment { assignment: Payload },
    /// Command for an in-room device.
    IotCommand { command: Payload },
    /// Liveness probe; answered automatically.
    Ping,
    /// Answer to a ping, echoing the ping's timestamp.
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ping_timestamp: Option<u64>,
    },
    /// Free-form application message.
    Message { data: Value },
}

impl MessageBody {
    /// Returns the kind of this body.
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Order { .. } => MessageKind::Order,
            MessageBody::Print { .. } => MessageKind::Print,
            MessageBody::Notification { .. } => MessageKind::Notification,
            MessageBody::RoomAssignment { .. } => MessageKind::RoomAssignment,
            MessageBody::IotCommand { .. } => MessageKind::IotCommand,
            MessageBody::Ping => MessageKind::Ping,
            MessageBody::Pong { .. } => MessageKind::Pong,
            MessageBody::Message { .. } => MessageKind::Message,
        }
    }
}

/// Envelope plus body, as exchanged between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct P2PMessage {
    pub message_id: MessageId,
    pub tenant_id: TenantId,
    pub sender_id: PeerId,
    /// Unix milliseconds at the sender.
    pub timestamp: u64,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl P2PMessage {
    /// Stamps a body with a fresh message id.
    pub fn new(tenant_id: &str, sender_id: &str, timestamp: u64, body: MessageBody) -> Self {
        P2PMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            sender_id: sender_id.to_string(),
            timestamp,
            body,
        }
    }

    /// Returns the kind of the body.
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}
