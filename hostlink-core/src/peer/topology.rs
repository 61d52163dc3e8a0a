// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Topology Monitor
//!
//! Classifies an established peer connection as local-direct or relayed
//! from its winning ICE candidate pair, and estimates what relaying costs.

use serde::{Deserialize, Serialize};

use crate::network::{CandidatePairStats, CandidateType};

/// Estimated relay egress price in USD per gigabyte.
pub const RELAY_COST_PER_GB: f64 = 0.40;

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Path taken by a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyKind {
    /// Both ends use host candidates on the property network.
    LocalDirect,
    /// Anything else (reflexive or TURN relayed).
    Relayed,
}

/// Snapshot of a peer connection's path, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTopology {
    pub kind: TopologyKind,
    /// Round trip in milliseconds, when known.
    pub latency_ms: Option<f64>,
    /// Estimated relay cost in USD for the bytes moved so far.
    pub estimated_cost: f64,
    pub local_candidate_type: CandidateType,
    pub remote_candidate_type: CandidateType,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl NetworkTopology {
    /// Returns true for local-direct paths.
    pub fn is_local(&self) -> bool {
        self.kind == TopologyKind::LocalDirect
    }
}

/// Classifies a candidate pair.
///
/// `local-direct` only when both candidates are host candidates.
pub fn classify(stats: &CandidatePairStats) -> NetworkTopology {
    let kind = if stats.local_candidate_type == CandidateType::Host
        && stats.remote_candidate_type == CandidateType::Host
    {
        TopologyKind::LocalDirect
    } else {
        TopologyKind::Relayed
    };

    let estimated_cost = match kind {
        TopologyKind::LocalDirect => 0.0,
        TopologyKind::Relayed => relay_cost(stats.bytes_sent + stats.bytes_received),
    };

    NetworkTopology {
        kind,
        latency_ms: stats.round_trip_time_ms,
        estimated_cost,
        local_candidate_type: stats.local_candidate_type,
        remote_candidate_type: stats.remote_candidate_type,
        bytes_sent: stats.bytes_sent,
        bytes_received: stats.bytes_received,
    }
}

/// Relay cost for a byte count.
pub fn relay_cost(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB * RELAY_COST_PER_GB
}
