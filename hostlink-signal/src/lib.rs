//! Hostlink Signaling Coordinator
//!
//! Connection-setup relay for property networks. Peers join a tenant room,
//! learn about each other, and exchange offers, answers and ICE candidates
//! through the coordinator; application traffic never passes through it.

pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod handler;
pub mod http;
pub mod metrics;

pub use config::SignalConfig;
pub use coordinator::{ClientSink, ConnectionId, Coordinator, CoordinatorError, Handled};
pub use metrics::SignalMetrics;
