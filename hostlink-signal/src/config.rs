//! Server Configuration
//!
//! Configuration loaded from `HOSTLINK_*` environment variables.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use hostlink_core::network::MAX_MESSAGE_SIZE;

/// Signaling server configuration.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// WebSocket listen address.
    pub listen_addr: SocketAddr,
    /// Port of the health/metrics HTTP server (same host as `listen_addr`).
    pub http_port: u16,
    /// Largest accepted signaling frame in bytes.
    pub max_message_size: usize,
    /// Seconds between stale-peer sweeps.
    pub sweep_interval_secs: u64,
    /// Seconds a peer's transport may stay non-open before it is removed.
    pub stale_after_secs: u64,
    /// Advertise the service over mDNS.
    pub mdns_enabled: bool,
    /// Bearer token required on `/metrics`, if set.
    pub metrics_token: Option<String>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            http_port: 8081,
            max_message_size: MAX_MESSAGE_SIZE,
            sweep_interval_secs: 60,
            stale_after_secs: 300,
            mdns_enabled: true,
            metrics_token: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl SignalConfig {
    /// Loads configuration from the environment, falling back to defaults
    /// for unset or unparsable values.
    pub fn from_env() -> Self {
        let defaults = SignalConfig::default();

        let mdns_enabled = env::var("HOSTLINK_MDNS")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.mdns_enabled);

        let metrics_token = env::var("HOSTLINK_METRICS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        SignalConfig {
            listen_addr: parse_var("HOSTLINK_LISTEN_ADDR", defaults.listen_addr),
            http_port: parse_var("HOSTLINK_HTTP_PORT", defaults.http_port),
            max_message_size: parse_var("HOSTLINK_MAX_MESSAGE_SIZE", defaults.max_message_size),
            sweep_interval_secs: parse_var(
                "HOSTLINK_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            ),
            stale_after_secs: parse_var("HOSTLINK_STALE_AFTER_SECS", defaults.stale_after_secs),
            mdns_enabled,
            metrics_token,
        }
    }

    /// Address of the health/metrics HTTP server.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr.ip(), self.http_port)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}
