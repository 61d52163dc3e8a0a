// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Distance Estimation
//!
//! Log-distance path-loss model and the category / accuracy ladders built
//! on top of it.

use serde::{Deserialize, Serialize};

/// Indoor path-loss exponent.
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.5;

/// Closest reported distance in meters.
pub const MIN_DISTANCE_METERS: f64 = 0.1;

/// Farthest reported distance in meters.
pub const MAX_DISTANCE_METERS: f64 = 100.0;

/// Estimates distance in meters from a smoothed RSSI.
///
/// `distance = 10 ^ ((tx_power - rssi) / (10 * n))`, clamped to
/// `[0.1, 100]`. An RSSI equal to `tx_power` is exactly one meter.
pub fn estimate_distance(tx_power: f64, rssi: f64, path_loss_exponent: f64) -> f64 {
    let exponent = (tx_power - rssi) / (10.0 * path_loss_exponent);
    let distance = 10f64.powf(exponent);

    if distance.is_nan() {
        return MAX_DISTANCE_METERS;
    }
    distance.clamp(MIN_DISTANCE_METERS, MAX_DISTANCE_METERS)
}

/// Coarse distance bucket of a single beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceCategory {
    /// Under 1 m.
    Immediate,
    /// Under 5 m.
    Near,
    /// Under 20 m.
    Far,
    Unknown,
}

impl DistanceCategory {
    /// Buckets a distance in meters.
    pub fn from_distance(meters: f64) -> Self {
        if meters < 1.0 {
            DistanceCategory::Immediate
        } else if meters < 5.0 {
            DistanceCategory::Near
        } else if meters < 20.0 {
            DistanceCategory::Far
        } else {
            DistanceCategory::Unknown
        }
    }
}

/// Confidence of a [`LocationContext`](super::LocationContext).
///
/// Ordered `Unknown < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    Unknown,
    Low,
    Medium,
    High,
}

impl AccuracyTier {
    /// Derives the tier from the closest beacon's category and the number
    /// of nearby beacons (closest included).
    ///
    /// | closest   | nearby | tier    |
    /// |-----------|--------|---------|
    /// | none      | any    | unknown |
    /// | immediate | >= 3   | high    |
    /// | immediate | < 3    | low     |
    /// | near      | >= 2   | medium  |
    /// | near      | < 2    | low     |
    /// | far       | any    | low     |
    /// | unknown   | any    | low     |
    pub fn from_context(closest: Option<DistanceCategory>, nearby: usize) -> Self {
        match closest {
            None => AccuracyTier::Unknown,
            Some(DistanceCategory::Immediate) if nearby >= 3 => AccuracyTier::High,
            Some(DistanceCategory::Near) if nearby >= 2 => AccuracyTier::Medium,
            Some(_) => AccuracyTier::Low,
        }
    }
}
