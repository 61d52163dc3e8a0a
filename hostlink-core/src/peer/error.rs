// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Manager Errors

use thiserror::Error;

use crate::network::NetworkError;

/// Errors surfaced by [`PeerManager`](super::PeerManager).
///
/// Only `connect()` returns these to callers; steady-state failures are
/// reported as [`PeerEvent`](super::PeerEvent)s.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeerError {
    /// Every configured signaling server failed within its timeout.
    #[error("no signaling server reachable ({attempted} tried): {last_error}")]
    SignalingUnavailable { attempted: usize, last_error: String },

    /// The manager was closed and cannot be used for this operation.
    #[error("connection manager closed")]
    Closed,

    /// Underlying transport error.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
}
