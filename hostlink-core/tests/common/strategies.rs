// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

// ============================================================
// Signal Strategies
// ============================================================

/// Calibrated one-meter power of real beacons.
pub fn tx_power_strategy() -> impl Strategy<Value = f64> {
    (-80i16..=-40).prop_map(f64::from)
}

/// Received signal strength in dBm.
pub fn rssi_strategy() -> impl Strategy<Value = i16> {
    -110i16..=-20
}

/// A run of readings from one beacon.
pub fn rssi_series_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<i16>> {
    prop::collection::vec(rssi_strategy(), min..max)
}

// ============================================================
// Identifier Strategies
// ============================================================

/// Peer ids as generated by devices.
pub fn peer_id_strategy() -> impl Strategy<Value = String> {
    "[a-z]{2,8}-[0-9]{1,3}"
}

/// Tenant ids.
pub fn tenant_id_strategy() -> impl Strategy<Value = String> {
    "hotel-[0-9]{1,4}"
}
