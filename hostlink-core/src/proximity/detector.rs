// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proximity Detector
//!
//! Turns beacon advertisements into tracked detections and a derived
//! [`LocationContext`]. Each beacon gets its own Kalman filter. Callbacks
//! are edge-triggered: they fire when the closest beacon or current zone
//! changes, not on every reading.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::beacon::{
    Advertisement, BeaconConfig, BeaconDetection, BeaconScanner, Coordinates,
};
use super::distance::{
    estimate_distance, AccuracyTier, DistanceCategory, DEFAULT_PATH_LOSS_EXPONENT,
};
use super::error::ProximityError;
use super::kalman::{KalmanFilter, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE};
use crate::events::{EventDispatcher, EventHandler};

/// Distance change (meters) since the last announcement that re-announces
/// a tracked beacon.
pub const DISTANCE_CHANGE_THRESHOLD: f64 = 1.0;

/// Scan session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Interval of the stale sweep.
    pub scan_interval_ms: u64,
    /// Detections older than this are dropped.
    pub stale_after_ms: u64,
    /// Readings below this RSSI are rejected. Equal is accepted.
    pub min_rssi: Option<i16>,
    /// Only beacons in these zones are tracked.
    pub zones: Option<HashSet<String>>,
    /// Beacons farther than this are rejected. Equal is accepted.
    pub max_distance: Option<f64>,
    pub process_noise: f64,
    pub measurement_noise: f64,
    pub path_loss_exponent: f64,
    /// Log unknown advertisements.
    pub debug: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            scan_interval_ms: 1000,
            stale_after_ms: 5000,
            min_rssi: None,
            zones: None,
            max_distance: None,
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            debug: false,
        }
    }
}

impl ScanConfig {
    pub fn with_min_rssi(mut self, rssi: i16) -> Self {
        self.min_rssi = Some(rssi);
        self
    }

    pub fn with_zones(mut self, zones: &[&str]) -> Self {
        self.zones = Some(zones.iter().map(|z| z.to_string()).collect());
        self
    }

    pub fn with_max_distance(mut self, meters: f64) -> Self {
        self.max_distance = Some(meters);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<(), ProximityError> {
        if self.scan_interval_ms == 0 {
            return Err(ProximityError::InvalidConfig(
                "scan interval must be positive".into(),
            ));
        }
        if !positive(self.path_loss_exponent) {
            return Err(ProximityError::InvalidConfig(
                "path loss exponent must be positive".into(),
            ));
        }
        if !positive(self.process_noise) || !positive(self.measurement_noise) {
            return Err(ProximityError::InvalidConfig(
                "noise parameters must be positive".into(),
            ));
        }
        if let Some(max) = self.max_distance {
            if !positive(max) {
                return Err(ProximityError::InvalidConfig(
                    "max distance must be positive".into(),
                ));
            }
        }
        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Events emitted by the detector.
#[derive(Debug, Clone, PartialEq)]
pub enum ProximityEvent {
    /// A beacon appeared or moved by more than a meter.
    BeaconDetected(BeaconDetection),
    /// A beacon went stale. Fires once per disappearance.
    BeaconLost { beacon_id: String },
    ClosestBeaconChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    ZoneChanged {
        previous: Option<String>,
        current: Option<String>,
    },
}

/// Derived location view, recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationContext {
    pub zone: Option<String>,
    pub area: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub closest_beacon: Option<BeaconDetection>,
    /// Sorted by distance, nearest first.
    pub nearby_beacons: Vec<BeaconDetection>,
    pub accuracy_tier: AccuracyTier,
    pub last_updated_ms: u64,
    pub is_on_property_network: bool,
}

/// Beacon proximity detector.
///
/// Driven by the host: advertisements go to
/// [`handle_advertisement`](Self::handle_advertisement) and a timer calls
/// [`tick`](Self::tick) at least every `scan_interval_ms`.
pub struct ProximityDetector<S: BeaconScanner> {
    scanner: S,
    config: ScanConfig,
    directory: HashMap<String, BeaconConfig>,
    detections: HashMap<String, BeaconDetection>,
    filters: HashMap<String, KalmanFilter>,
    announced: HashMap<String, f64>,
    closest: Option<String>,
    zone: Option<String>,
    scanning: bool,
    on_property_network: bool,
    next_sweep_ms: Option<u64>,
    events: EventDispatcher<ProximityEvent>,
}

impl<S: BeaconScanner> ProximityDetector<S> {
    /// Creates a detector. Fails if the config is out of range.
    pub fn new(scanner: S, config: ScanConfig) -> Result<Self, ProximityError> {
        config.validate()?;
        Ok(ProximityDetector {
            scanner,
            config,
            directory: HashMap::new(),
            detections: HashMap::new(),
            filters: HashMap::new(),
            announced: HashMap::new(),
            closest: None,
            zone: None,
            scanning: false,
            on_property_network: false,
            next_sweep_ms: None,
            events: EventDispatcher::new(),
        })
    }

    /// Adds an event handler.
    pub fn add_event_handler(&mut self, handler: Arc<dyn EventHandler<ProximityEvent>>) {
        self.events.add_handler(handler);
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// The platform scanner.
    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Records whether the device is on the property network.
    pub fn set_on_property_network(&mut self, on_network: bool) {
        self.on_property_network = on_network;
    }

    /// Starts a scan session with the tenant's beacon directory.
    ///
    /// Returns false, without scanning, when the platform lacks the
    /// capability. A running session is restarted.
    pub fn start_scanning(&mut self, directory: Vec<BeaconConfig>) -> bool {
        if self.scanning {
            self.stop_scanning();
        }

        if !self.scanner.preflight() {
            warn!("Beacon scanning unavailable: permission denied");
            return false;
        }

        self.directory = directory
            .into_iter()
            .map(|beacon| (beacon.beacon_id(), beacon))
            .collect();

        if !self.scanner.start() {
            warn!("Beacon scanner refused to start");
            self.directory.clear();
            return false;
        }

        self.scanning = true;
        info!("Scanning for {} known beacons", self.directory.len());
        true
    }

    /// Stops scanning and forgets every detection without emitting events.
    pub fn stop_scanning(&mut self) {
        if self.scanning {
            self.scanner.stop();
        }
        self.scanning = false;
        self.next_sweep_ms = None;
        self.directory.clear();
        self.detections.clear();
        self.filters.clear();
        self.announced.clear();
        self.closest = None;
        self.zone = None;
    }

    /// Processes one advertisement received at `now_ms`.
    ///
    /// Returns true if the reading was accepted.
    pub fn handle_advertisement(&mut self, advertisement: &Advertisement, now_ms: u64) -> bool {
        if !self.scanning {
            return false;
        }

        let beacon_id = advertisement.protocol_ids.beacon_id();
        let Some(beacon) = self.directory.get(&beacon_id) else {
            if self.config.debug {
                debug!("Ignoring unknown beacon {}", beacon_id);
            }
            return false;
        };

        if let Some(min) = self.config.min_rssi {
            if advertisement.rssi < min {
                return false;
            }
        }
        if let Some(zones) = &self.config.zones {
            if !zones.contains(&beacon.zone) {
                return false;
            }
        }

        let filter = self.filters.entry(beacon_id.clone()).or_insert_with(|| {
            KalmanFilter::new(self.config.process_noise, self.config.measurement_noise)
        });
        let smoothed = filter.update(f64::from(advertisement.rssi));
        let distance = estimate_distance(beacon.tx_power, smoothed, self.config.path_loss_exponent);

        if let Some(max) = self.config.max_distance {
            if distance > max {
                if !self.detections.contains_key(&beacon_id) {
                    self.filters.remove(&beacon_id);
                }
                return false;
            }
        }

        let category = DistanceCategory::from_distance(distance);
        let mut events = Vec::new();

        match self.detections.get_mut(&beacon_id) {
            Some(detection) => {
                let announced = self.announced.entry(beacon_id).or_insert(distance);
                let moved = (distance - *announced).abs() > DISTANCE_CHANGE_THRESHOLD;
                detection.rssi = smoothed;
                detection.distance_meters = distance;
                detection.category = category;
                detection.detected_at_ms = now_ms;
                if moved {
                    *announced = distance;
                    events.push(ProximityEvent::BeaconDetected(detection.clone()));
                }
            }
            None => {
                let detection = BeaconDetection {
                    beacon_id: beacon_id.clone(),
                    protocol_ids: beacon.protocol_ids.clone(),
                    rssi: smoothed,
                    distance_meters: distance,
                    category,
                    zone: beacon.zone.clone(),
                    area: beacon.area.clone(),
                    coordinates: beacon.coordinates,
                    metadata: beacon.metadata.clone(),
                    detected_at_ms: now_ms,
                };
                events.push(ProximityEvent::BeaconDetected(detection.clone()));
                self.announced.insert(beacon_id.clone(), distance);
                self.detections.insert(beacon_id, detection);
            }
        }

        self.reevaluate(&mut events);
        self.events.dispatch_all(events);
        true
    }

    /// Runs the stale sweep when its interval has elapsed.
    pub fn tick(&mut self, now_ms: u64) {
        if !self.scanning {
            return;
        }

        match self.next_sweep_ms {
            Some(due) if now_ms < due => {}
            Some(_) => {
                self.sweep(now_ms);
                self.next_sweep_ms = Some(now_ms + self.config.scan_interval_ms);
            }
            None => self.next_sweep_ms = Some(now_ms + self.config.scan_interval_ms),
        }
    }

    /// Drops detections older than `stale_after_ms` and returns their ids.
    pub fn sweep(&mut self, now_ms: u64) -> Vec<String> {
        let stale_after = self.config.stale_after_ms;
        let mut lost: Vec<String> = self
            .detections
            .values()
            .filter(|d| now_ms.saturating_sub(d.detected_at_ms) > stale_after)
            .map(|d| d.beacon_id.clone())
            .collect();
        lost.sort();

        if lost.is_empty() {
            return lost;
        }

        let mut events = Vec::with_capacity(lost.len());
        for beacon_id in &lost {
            self.detections.remove(beacon_id);
            self.filters.remove(beacon_id);
            self.announced.remove(beacon_id);
            debug!("Beacon {} lost", beacon_id);
            events.push(ProximityEvent::BeaconLost {
                beacon_id: beacon_id.clone(),
            });
        }

        self.reevaluate(&mut events);
        self.events.dispatch_all(events);
        lost
    }

    /// Builds the current location view.
    pub fn location_context(&self) -> LocationContext {
        let nearby = self.nearby_beacons();
        let closest = nearby.first().cloned();
        let accuracy_tier =
            AccuracyTier::from_context(closest.as_ref().map(|d| d.category), nearby.len());
        let last_updated_ms = nearby.iter().map(|d| d.detected_at_ms).max().unwrap_or(0);

        LocationContext {
            zone: closest.as_ref().map(|d| d.zone.clone()),
            area: closest.as_ref().map(|d| d.area.clone()),
            coordinates: closest.as_ref().and_then(|d| d.coordinates),
            closest_beacon: closest,
            nearby_beacons: nearby,
            accuracy_tier,
            last_updated_ms,
            is_on_property_network: self.on_property_network,
        }
    }

    /// Tracked detections, nearest first.
    pub fn nearby_beacons(&self) -> Vec<BeaconDetection> {
        let mut nearby: Vec<BeaconDetection> = self.detections.values().cloned().collect();
        nearby.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then_with(|| a.beacon_id.cmp(&b.beacon_id))
        });
        nearby
    }

    pub fn detection(&self, beacon_id: &str) -> Option<&BeaconDetection> {
        self.detections.get(beacon_id)
    }

    /// Filter state of a tracked beacon.
    pub fn filter(&self, beacon_id: &str) -> Option<&KalmanFilter> {
        self.filters.get(beacon_id)
    }

    pub fn closest_beacon(&self) -> Option<&str> {
        self.closest.as_deref()
    }

    pub fn current_zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn reevaluate(&mut self, events: &mut Vec<ProximityEvent>) {
        let closest = self
            .detections
            .values()
            .min_by(|a, b| {
                a.distance_meters
                    .total_cmp(&b.distance_meters)
                    .then_with(|| a.beacon_id.cmp(&b.beacon_id))
            })
            .map(|d| (d.beacon_id.clone(), d.zone.clone()));

        let (closest_id, zone) = match closest {
            Some((id, zone)) => (Some(id), Some(zone)),
            None => (None, None),
        };

        if closest_id != self.closest {
            events.push(ProximityEvent::ClosestBeaconChanged {
                previous: self.closest.take(),
                current: closest_id.clone(),
            });
            self.closest = closest_id;
        }

        if zone != self.zone {
            events.push(ProximityEvent::ZoneChanged {
                previous: self.zone.take(),
                current: zone.clone(),
            });
            self.zone = zone;
        }
    }
}
