//! Property-Network Discovery
//!
//! Advertises the coordinator over mDNS so devices on the property network
//! can find it without configured URLs.

use mdns_sd::{ServiceDaemon, ServiceInfo};
use thiserror::Error;
use tracing::{error, info};

/// mDNS service type of the coordinator.
pub const SERVICE_TYPE: &str = "_hospitality._tcp.local.";

/// Instance name announced on the network.
pub const INSTANCE_NAME: &str = "hostlink-signal";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("mDNS error: {0}")]
    Mdns(#[from] mdns_sd::Error),

    #[error("No local address: {0}")]
    LocalAddress(#[from] local_ip_address::Error),
}

/// A registered mDNS advertisement. Unregistered on drop.
pub struct Advertisement {
    daemon: ServiceDaemon,
    fullname: String,
}

impl Advertisement {
    /// Advertises the WebSocket endpoint on `port`.
    pub fn register(port: u16) -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new()?;
        let ip = local_ip_address::local_ip()?;
        let host_name = format!("{}.local.", INSTANCE_NAME);

        let properties = [
            ("version", env!("CARGO_PKG_VERSION")),
            ("protocol", "ws"),
            ("path", "/"),
        ];

        let service = ServiceInfo::new(
            SERVICE_TYPE,
            INSTANCE_NAME,
            &host_name,
            ip.to_string().as_str(),
            port,
            &properties[..],
        )?;
        let fullname = service.get_fullname().to_string();

        daemon.register(service)?;
        info!("Advertising {} on {}:{}", fullname, ip, port);

        Ok(Advertisement { daemon, fullname })
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }
}

impl Drop for Advertisement {
    fn drop(&mut self) {
        info!("Withdrawing mDNS advertisement {}", self.fullname);
        if let Err(e) = self.daemon.unregister(&self.fullname) {
            error!("Failed to unregister {}: {}", self.fullname, e);
        }
        let _ = self.daemon.shutdown();
    }
}
