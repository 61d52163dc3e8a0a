// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network Error Types
//!
//! Error types for signaling and peer transport operations.

use thiserror::Error;

/// Network and transport error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timeout")]
    Timeout,

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Message receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Negotiation failed: {0}")]
    NegotiationFailed(String),

    #[error("Transport not connected")]
    NotConnected,
}

impl NetworkError {
    /// Returns true if the error concerns one frame rather than the link.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            NetworkError::InvalidMessage(_) | NetworkError::Serialization(_)
        )
    }
}
