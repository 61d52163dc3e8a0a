// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Peer Connection Layer
//!
//! Connection manager, message router and topology monitor built on the
//! transport traits in [`crate::network`].

mod config;
mod error;
mod events;
mod manager;
mod router;
mod topology;

pub use config::{PeerManagerConfig, DEFAULT_STUN_SERVER};
pub use error::PeerError;
pub use events::{DisconnectReason, PeerEvent};
pub use manager::{PeerManager, SendOutcome};
pub use router::{MessageHandler, MessageRouter, RouteAction};
pub use topology::{classify, relay_cost, NetworkTopology, TopologyKind, RELAY_COST_PER_GB};
