//! Hostlink Signaling Server
//!
//! Provides:
//! - WebSocket endpoint for tenant-scoped peer signaling
//! - HTTP endpoints for health checks and Prometheus metrics
//! - mDNS advertisement on the property network

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing::{error, info, warn};

use hostlink_core::clock::now_millis;
use hostlink_signal::discovery::Advertisement;
use hostlink_signal::handler::{self, refresh_gauges, SharedCoordinator};
use hostlink_signal::http::{create_router, HttpState};
use hostlink_signal::{Coordinator, SignalConfig, SignalMetrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hostlink_signal=info".parse()?),
        )
        .init();

    let config = SignalConfig::from_env();
    info!(
        "Starting Hostlink Signaling Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("WebSocket: {}", config.listen_addr);
    info!("HTTP (health/metrics): {}", config.http_addr());

    let metrics = SignalMetrics::new()?;
    let coordinator: SharedCoordinator =
        Arc::new(Mutex::new(Coordinator::new(config.max_message_size)));
    let start_time = Instant::now();

    // Health/metrics server
    let http_router = create_router(HttpState {
        metrics: metrics.clone(),
        coordinator: coordinator.clone(),
        start_time,
        metrics_token: config.metrics_token.clone(),
    });
    let http_addr = config.http_addr();
    let http_listener = TcpListener::bind(http_addr).await?;
    tokio::spawn(async move {
        info!("HTTP server listening on {}", http_addr);
        if let Err(e) = axum::serve(http_listener, http_router).await {
            error!("HTTP server stopped: {}", e);
        }
    });

    // Stale peer sweep
    let sweep_coordinator = coordinator.clone();
    let sweep_metrics = metrics.clone();
    let sweep_interval = config.sweep_interval();
    let stale_after_ms = config.stale_after().as_millis() as u64;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            let Ok(mut coordinator) = sweep_coordinator.lock() else {
                error!("Coordinator lock poisoned, stopping sweep");
                break;
            };
            let removed = coordinator.sweep(now_millis(), stale_after_ms);
            refresh_gauges(&sweep_metrics, &coordinator);
            if !removed.is_empty() {
                info!("Swept {} stale peers", removed.len());
                sweep_metrics.peers_swept.inc_by(removed.len() as u64);
            }
        }
    });

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("WebSocket server listening on {}", config.listen_addr);

    // Kept alive for the lifetime of the accept loop
    let _advertisement = if config.mdns_enabled {
        match Advertisement::register(config.listen_addr.port()) {
            Ok(advertisement) => Some(advertisement),
            Err(e) => {
                warn!("mDNS advertisement unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    while let Ok((stream, addr)) = listener.accept().await {
        let coordinator = coordinator.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws_stream) => {
                    info!("New connection from {}", addr);
                    metrics.connections_total.inc();
                    metrics.connections_active.inc();

                    handler::handle_connection(ws_stream, coordinator, metrics.clone()).await;

                    metrics.connections_active.dec();
                    info!("Connection closed: {}", addr);
                }
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    metrics.connection_errors.inc();
                }
            }
        });
    }

    Ok(())
}
