// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Beacon Types
//!
//! Directory entries, raw advertisements, tracked detections and the
//! platform scanner seam.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::distance::DistanceCategory;

/// Identifiers broadcast by a beacon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ProtocolIds {
    /// Apple iBeacon.
    IBeacon { uuid: String, major: u16, minor: u16 },
    /// Eddystone-UID.
    Eddystone { namespace: String, instance: String },
}

impl ProtocolIds {
    /// Creates iBeacon ids.
    pub fn ibeacon(uuid: &str, major: u16, minor: u16) -> Self {
        ProtocolIds::IBeacon {
            uuid: uuid.to_string(),
            major,
            minor,
        }
    }

    /// Creates Eddystone-UID ids.
    pub fn eddystone(namespace: &str, instance: &str) -> Self {
        ProtocolIds::Eddystone {
            namespace: namespace.to_string(),
            instance: instance.to_string(),
        }
    }

    /// Canonical beacon id. Hex parts are lowercased so the same beacon
    /// matches regardless of how the platform formats them.
    pub fn beacon_id(&self) -> String {
        match self {
            ProtocolIds::IBeacon { uuid, major, minor } => {
                format!("ibeacon:{}:{}:{}", uuid.to_lowercase(), major, minor)
            }
            ProtocolIds::Eddystone {
                namespace,
                instance,
            } => format!(
                "eddystone:{}:{}",
                namespace.to_lowercase(),
                instance.to_lowercase()
            ),
        }
    }
}

/// Position on the property floor plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
}

/// Directory entry for one installed beacon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconConfig {
    pub protocol_ids: ProtocolIds,
    /// Coarse location, e.g. "restaurant".
    pub zone: String,
    /// Fine location, e.g. "table-5".
    #[serde(default)]
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Calibrated RSSI at one meter.
    pub tx_power: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl BeaconConfig {
    /// Creates an entry with no area, coordinates or metadata.
    pub fn new(protocol_ids: ProtocolIds, zone: &str, tx_power: f64) -> Self {
        BeaconConfig {
            protocol_ids,
            zone: zone.to_string(),
            area: String::new(),
            coordinates: None,
            tx_power,
            metadata: HashMap::new(),
        }
    }

    pub fn with_area(mut self, area: &str) -> Self {
        self.area = area.to_string();
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn beacon_id(&self) -> String {
        self.protocol_ids.beacon_id()
    }
}

/// One received advertisement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub protocol_ids: ProtocolIds,
    /// Signal strength in dBm.
    pub rssi: i16,
}

impl Advertisement {
    pub fn new(protocol_ids: ProtocolIds, rssi: i16) -> Self {
        Advertisement { protocol_ids, rssi }
    }
}

/// A tracked beacon, updated in place on every accepted sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconDetection {
    pub beacon_id: String,
    pub protocol_ids: ProtocolIds,
    /// Smoothed RSSI.
    pub rssi: f64,
    pub distance_meters: f64,
    #[serde(rename = "accuracyTier")]
    pub category: DistanceCategory,
    pub zone: String,
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub detected_at_ms: u64,
}

/// Platform beacon scanner.
///
/// Advertisements are delivered by the host through
/// [`ProximityDetector::handle_advertisement`](super::ProximityDetector::handle_advertisement);
/// this trait only covers capability checks and radio control.
pub trait BeaconScanner: Send {
    /// Returns false when scanning permission or hardware is unavailable.
    fn preflight(&mut self) -> bool;

    /// Starts the radio. Returns false if the platform refused.
    fn start(&mut self) -> bool;

    fn stop(&mut self);
}

/// Mock scanner for testing.
#[derive(Debug, Clone)]
pub struct MockBeaconScanner {
    /// Whether preflight succeeds.
    pub permitted: bool,
    /// Whether the radio is currently on.
    pub running: bool,
    /// Number of successful starts.
    pub start_count: usize,
}

impl Default for MockBeaconScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBeaconScanner {
    /// Creates a scanner with permission granted.
    pub fn new() -> Self {
        MockBeaconScanner {
            permitted: true,
            running: false,
            start_count: 0,
        }
    }

    /// Creates a scanner whose preflight always fails.
    pub fn denied() -> Self {
        MockBeaconScanner {
            permitted: false,
            ..Self::new()
        }
    }
}

impl BeaconScanner for MockBeaconScanner {
    fn preflight(&mut self) -> bool {
        self.permitted
    }

    fn start(&mut self) -> bool {
        if !self.permitted {
            return false;
        }
        self.running = true;
        self.start_count += 1;
        true
    }

    fn stop(&mut self) {
        self.running = false;
    }
}
