//! Server identity: the canonical IP every domain is compared against.

use crate::error::DomainAuditError;
use crate::types::VerifyConfig;
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Public address used only to pick the outbound interface. Nothing is sent.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Return the configured server IP, or detect the primary outbound address.
///
/// # Errors
///
/// A `ConfigError` when no address is configured and none can be detected.
pub async fn resolve_server_ip(config: &VerifyConfig) -> Result<IpAddr, DomainAuditError> {
    if let Some(ip) = config.server_ip {
        return Ok(ip);
    }

    let ip = detect_outbound_ip().await.map_err(|e| {
        DomainAuditError::config(format!(
            "Cannot determine server IP ({}); pass --server-ip",
            e
        ))
    })?;
    debug!(server_ip = %ip, "Detected server IP");
    Ok(ip)
}

/// Connect a UDP socket towards a public address and read back the local
/// address the kernel picked.
async fn detect_outbound_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let target: SocketAddr = ROUTE_PROBE_ADDR
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    socket.connect(target).await?;

    let local = socket.local_addr()?.ip();
    if local.is_unspecified() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "no routable interface",
        ));
    }
    Ok(local)
}
