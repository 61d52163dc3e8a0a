// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proximity Errors

use thiserror::Error;

/// Errors from proximity configuration and directory lookup.
///
/// Scanning itself never fails with an error: a missing platform
/// capability is a `false` from
/// [`ProximityDetector::start_scanning`](super::ProximityDetector::start_scanning)
/// and unknown or filtered advertisements are dropped.
#[derive(Debug, Error)]
pub enum ProximityError {
    /// A scan parameter is out of range.
    #[error("Invalid scan config: {0}")]
    InvalidConfig(String),

    /// Directory server answered with a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// Directory request failed.
    #[cfg(feature = "directory-http")]
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Directory payload could not be parsed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A directory entry is unusable.
    #[error("Invalid beacon entry: {0}")]
    InvalidBeacon(String),

    /// HTTP directory support was not compiled in.
    #[error("Beacon directory feature is not enabled")]
    FeatureDisabled,
}
