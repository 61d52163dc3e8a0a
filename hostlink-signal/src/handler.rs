//! WebSocket Connection Handler
//!
//! Bridges one client socket to the shared [`Coordinator`]. Outbound frames
//! go through an unbounded channel drained by a writer task, so the
//! coordinator never awaits on a socket.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

use hostlink_core::clock::now_millis;

use crate::coordinator::{ClientSink, Coordinator, Handled};
use crate::metrics::SignalMetrics;

/// Coordinator shared between connection tasks.
pub type SharedCoordinator = Arc<Mutex<Coordinator>>;

/// [`ClientSink`] backed by the connection's outbound channel.
pub struct ChannelSink {
    tx: UnboundedSender<Message>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<Message>) -> Self {
        ChannelSink { tx }
    }
}

impl ClientSink for ChannelSink {
    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send_text(&self, text: &str) -> bool {
        self.tx.send(Message::Text(text.to_string())).is_ok()
    }
}

/// Records the outcome of one frame in the metrics.
pub fn record(metrics: &SignalMetrics, handled: &Handled) {
    match handled {
        Handled::Relayed => metrics.messages_relayed.inc(),
        Handled::Dropped => metrics.messages_dropped.inc(),
        Handled::Rejected(_) => metrics.messages_malformed.inc(),
        Handled::Joined | Handled::Left | Handled::Ignored => {}
    }
}

/// Refreshes the registry gauges from the coordinator.
pub fn refresh_gauges(metrics: &SignalMetrics, coordinator: &Coordinator) {
    metrics.peers_registered.set(coordinator.peer_count() as i64);
    metrics.tenants_active.set(coordinator.tenant_count() as i64);
}

/// Handles a WebSocket connection until the client goes away.
pub async fn handle_connection(
    ws_stream: WebSocketStream<TcpStream>,
    coordinator: SharedCoordinator,
    metrics: SignalMetrics,
) {
    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let connection = match coordinator.lock() {
        Ok(mut coordinator) => coordinator.attach(Box::new(ChannelSink::new(tx.clone()))),
        Err(_) => {
            warn!("Coordinator lock poisoned, refusing connection");
            return;
        }
    };
    debug!("Attached connection {}", connection);

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.send(message).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => String::from_utf8_lossy(&data).into_owned(),
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
                continue;
            }
            Ok(Message::Close(_)) => {
                debug!("Connection {} sent close", connection);
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("Error on connection {}: {}", connection, e);
                metrics.connection_errors.inc();
                break;
            }
        };

        let handled = match coordinator.lock() {
            Ok(mut coordinator) => {
                let handled = coordinator.handle_text(connection, &text, now_millis());
                refresh_gauges(&metrics, &coordinator);
                handled
            }
            Err(_) => {
                warn!("Coordinator lock poisoned, closing connection {}", connection);
                break;
            }
        };
        record(&metrics, &handled);
    }

    if let Ok(mut coordinator) = coordinator.lock() {
        coordinator.detach(connection, now_millis());
        refresh_gauges(&metrics, &coordinator);
    }
    drop(tx);
    let _ = writer.await;
}
