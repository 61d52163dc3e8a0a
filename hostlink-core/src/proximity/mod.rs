// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Beacon Proximity
//!
//! Smooths beacon signal strength per source, converts it to distance and
//! derives the device's zone on the property.
//!
//! - [`KalmanFilter`]: per-beacon RSSI smoothing
//! - [`estimate_distance`]: log-distance path-loss model
//! - [`ProximityDetector`]: detection tracking, stale sweep, edge-triggered events
//! - [`parse_directory`] / [`HttpBeaconDirectory`]: tenant beacon directory

mod beacon;
mod detector;
mod directory;
mod distance;
mod error;
mod kalman;

pub use beacon::{
    Advertisement, BeaconConfig, BeaconDetection, BeaconScanner, Coordinates,
    MockBeaconScanner, ProtocolIds,
};
pub use detector::{
    LocationContext, ProximityDetector, ProximityEvent, ScanConfig, DISTANCE_CHANGE_THRESHOLD,
};
pub use directory::{parse_directory, validate_beacon, HttpBeaconDirectory};
pub use distance::{
    estimate_distance, AccuracyTier, DistanceCategory, DEFAULT_PATH_LOSS_EXPONENT,
    MAX_DISTANCE_METERS, MIN_DISTANCE_METERS,
};
pub use error::ProximityError;
pub use kalman::{KalmanFilter, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE};
