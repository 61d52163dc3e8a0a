// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Layer
//!
//! JSON encoding and validation for both wire protocols. Decoding happens
//! only here, at the transport boundary.

use super::error::NetworkError;
use super::message::P2PMessage;
use super::signaling::SignalingMessage;

/// Maximum encoded message size (64 KB).
pub const MAX_MESSAGE_SIZE: usize = 65_536;

fn check_size(len: usize) -> Result<(), NetworkError> {
    if len > MAX_MESSAGE_SIZE {
        return Err(NetworkError::InvalidMessage(format!(
            "Message too large: {} bytes (max {})",
            len, MAX_MESSAGE_SIZE
        )));
    }
    Ok(())
}

/// Serializes a signaling message to a JSON text frame.
pub fn encode_signaling(message: &SignalingMessage) -> Result<String, NetworkError> {
    let json =
        serde_json::to_string(message).map_err(|e| NetworkError::Serialization(e.to_string()))?;
    check_size(json.len())?;
    Ok(json)
}

/// Parses a signaling text frame.
///
/// Unknown `type` tags, missing required fields and empty ids are
/// `InvalidMessage`.
pub fn decode_signaling(text: &str) -> Result<SignalingMessage, NetworkError> {
    check_size(text.len())?;
    let message: SignalingMessage =
        serde_json::from_str(text).map_err(|e| NetworkError::InvalidMessage(e.to_string()))?;

    let ids = [
        ("peerId", message.peer_id()),
        ("tenantId", message.tenant_id()),
        ("targetPeerId", message.target_peer_id()),
    ];
    if let Some((field, _)) = ids.iter().find(|(_, id)| *id == Some("")) {
        return Err(NetworkError::InvalidMessage(format!("Empty {}", field)));
    }

    Ok(message)
}

/// Serializes a peer message to a JSON text frame.
pub fn encode_p2p(message: &P2PMessage) -> Result<String, NetworkError> {
    let json =
        serde_json::to_string(message).map_err(|e| NetworkError::Serialization(e.to_string()))?;
    check_size(json.len())?;
    Ok(json)
}

/// Parses a data-channel text frame.
pub fn decode_p2p(text: &str) -> Result<P2PMessage, NetworkError> {
    check_size(text.len())?;
    let message: P2PMessage =
        serde_json::from_str(text).map_err(|e| NetworkError::InvalidMessage(e.to_string()))?;

    if message.message_id.is_empty() || message.sender_id.is_empty() {
        return Err(NetworkError::InvalidMessage(
            "Missing message or sender id".into(),
        ));
    }

    Ok(message)
}
