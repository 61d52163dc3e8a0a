//! Prometheus Metrics
//!
//! Counters and gauges exposed on `/metrics`.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use tracing::error;

/// Signaling server metrics. Clones share the same registry.
#[derive(Clone)]
pub struct SignalMetrics {
    registry: Registry,
    pub connections_total: IntCounter,
    pub connections_active: IntGauge,
    pub connection_errors: IntCounter,
    pub peers_registered: IntGauge,
    pub tenants_active: IntGauge,
    pub messages_relayed: IntCounter,
    pub messages_dropped: IntCounter,
    pub messages_malformed: IntCounter,
    pub peers_swept: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntGauge> {
    let gauge = IntGauge::new(name, help)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl SignalMetrics {
    /// Creates and registers all metrics in a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        Ok(SignalMetrics {
            connections_total: counter(
                &registry,
                "hostlink_connections_total",
                "WebSocket connections accepted",
            )?,
            connections_active: gauge(
                &registry,
                "hostlink_connections_active",
                "WebSocket connections currently open",
            )?,
            connection_errors: counter(
                &registry,
                "hostlink_connection_errors_total",
                "Failed WebSocket handshakes and socket errors",
            )?,
            peers_registered: gauge(
                &registry,
                "hostlink_peers_registered",
                "Peers currently joined to a tenant room",
            )?,
            tenants_active: gauge(
                &registry,
                "hostlink_tenants_active",
                "Tenant rooms with at least one peer",
            )?,
            messages_relayed: counter(
                &registry,
                "hostlink_messages_relayed_total",
                "Offers, answers and candidates forwarded to their target",
            )?,
            messages_dropped: counter(
                &registry,
                "hostlink_messages_dropped_total",
                "Relayable messages whose target was absent or closed",
            )?,
            messages_malformed: counter(
                &registry,
                "hostlink_messages_malformed_total",
                "Frames rejected with an error reply",
            )?,
            peers_swept: counter(
                &registry,
                "hostlink_peers_swept_total",
                "Peers removed by the stale sweep",
            )?,
            registry,
        })
    }

    /// Encodes all metrics in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
