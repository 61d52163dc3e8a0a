// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! One-dimensional Kalman filter for RSSI smoothing.

use serde::{Deserialize, Serialize};

/// Default process noise (how fast the true signal may drift).
pub const DEFAULT_PROCESS_NOISE: f64 = 0.008;

/// Default measurement noise (variance of a single RSSI reading).
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 4.0;

/// Per-beacon filter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KalmanFilter {
    estimate: f64,
    error_covariance: f64,
    process_noise: f64,
    measurement_noise: f64,
    initialized: bool,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE)
    }
}

impl KalmanFilter {
    /// Creates an uninitialized filter.
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        KalmanFilter {
            estimate: 0.0,
            error_covariance: 1.0,
            process_noise,
            measurement_noise,
            initialized: false,
        }
    }

    /// Feeds one measurement and returns the new estimate.
    ///
    /// The first measurement is taken as-is with covariance 1.
    pub fn update(&mut self, measurement: f64) -> f64 {
        if !self.initialized {
            self.estimate = measurement;
            self.error_covariance = 1.0;
            self.initialized = true;
            return self.estimate;
        }

        let predicted = self.error_covariance + self.process_noise;
        let gain = predicted / (predicted + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance = (1.0 - gain) * predicted;
        self.estimate
    }

    /// Current estimate (0 before the first update).
    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn error_covariance(&self) -> f64 {
        self.error_covariance
    }

    /// Returns true once a measurement has been seen.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
