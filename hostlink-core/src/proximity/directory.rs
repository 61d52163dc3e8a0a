// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Beacon Directory
//!
//! The per-tenant list of installed beacons, loaded once per scan session.
//! Entries that fail to parse or validate are skipped so one bad row never
//! hides the rest of the property.

use std::time::Duration;

use tracing::warn;

use super::beacon::BeaconConfig;
use super::error::ProximityError;

#[cfg(feature = "directory-http")]
use reqwest::Client;

/// Parses a directory payload (a JSON array of beacon entries).
pub fn parse_directory(json: &str) -> Result<Vec<BeaconConfig>, ProximityError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut beacons = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let beacon = serde_json::from_value::<BeaconConfig>(row)
            .map_err(|e| ProximityError::InvalidBeacon(e.to_string()))
            .and_then(|b| validate_beacon(&b).map(|_| b));

        match beacon {
            Ok(beacon) => beacons.push(beacon),
            Err(e) => warn!("Skipping directory entry {}: {}", index, e),
        }
    }

    Ok(beacons)
}

/// Checks a single entry.
pub fn validate_beacon(beacon: &BeaconConfig) -> Result<(), ProximityError> {
    if beacon.zone.trim().is_empty() {
        return Err(ProximityError::InvalidBeacon(format!(
            "{} has no zone",
            beacon.beacon_id()
        )));
    }
    if !beacon.tx_power.is_finite() {
        return Err(ProximityError::InvalidBeacon(format!(
            "{} has no usable tx power",
            beacon.beacon_id()
        )));
    }
    Ok(())
}

/// Fetches beacon directories over HTTP.
///
/// `GET {base_url}/tenants/{tenant_id}/beacons`
#[cfg(feature = "directory-http")]
pub struct HttpBeaconDirectory {
    client: Client,
    base_url: String,
}

#[cfg(feature = "directory-http")]
impl HttpBeaconDirectory {
    /// Creates a client with a request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProximityError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "Hostlink/{}",
                option_env!("CARGO_PKG_VERSION").unwrap_or("0.1.0")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the directory for one tenant.
    pub async fn fetch(&self, tenant_id: &str) -> Result<Vec<BeaconConfig>, ProximityError> {
        let url = self.url_for(tenant_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ProximityError::HttpError(response.status().as_u16()));
        }

        let body = response.text().await?;
        parse_directory(&body)
    }

    /// Directory URL for a tenant.
    pub fn url_for(&self, tenant_id: &str) -> String {
        format!("{}/tenants/{}/beacons", self.base_url, tenant_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Stub directory when `directory-http` is not enabled.
#[cfg(not(feature = "directory-http"))]
pub struct HttpBeaconDirectory {
    _private: (),
}

#[cfg(not(feature = "directory-http"))]
impl HttpBeaconDirectory {
    /// Always fails without the `directory-http` feature.
    pub fn new(_base_url: &str, _timeout: Duration) -> Result<Self, ProximityError> {
        Err(ProximityError::FeatureDisabled)
    }
}
