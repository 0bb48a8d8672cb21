//! Choice of the local address every bootstrap socket listens on.
//!
//! Resolved once per session and carried inside it; there is no
//! process-wide cache.

use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Where the interface address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceSource {
    /// `BootstrapConfig::interface_addr` / `NEXAR_BOOTSTRAP_IFADDR`.
    Configured,
    /// The local address routing to the explicit rendezvous address.
    RendezvousRoute,
    /// The address of the default route.
    DefaultRoute,
    /// Nothing routable was found.
    Loopback,
}

/// The interface this session listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetInterface {
    pub addr: IpAddr,
    pub source: InterfaceSource,
}

/// Documentation-range address used only to consult the routing table.
const DEFAULT_ROUTE_TARGET: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 9);

impl NetInterface {
    /// Pick the listening address for a session.
    ///
    /// With an explicit rendezvous address the interface that routes to it
    /// is required; failing to find one is a configuration error.
    pub async fn resolve(config: &BootstrapConfig, rendezvous: Option<SocketAddr>) -> Result<Self> {
        let iface = if let Some(addr) = config.interface_addr {
            Self {
                addr,
                source: InterfaceSource::Configured,
            }
        } else if let Some(remote) = rendezvous {
            let addr = route_to(remote).await.map_err(|e| {
                BootstrapError::NoInterface(format!("no interface routes to {remote}: {e}"))
            })?;
            Self {
                addr,
                source: InterfaceSource::RendezvousRoute,
            }
        } else {
            match route_to(DEFAULT_ROUTE_TARGET).await {
                Ok(addr) => Self {
                    addr,
                    source: InterfaceSource::DefaultRoute,
                },
                Err(e) => {
                    tracing::warn!("no default route ({e}), bootstrap falls back to loopback");
                    Self {
                        addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
                        source: InterfaceSource::Loopback,
                    }
                }
            }
        };
        tracing::info!("bootstrap: using interface {iface}");
        Ok(iface)
    }
}

impl fmt::Display for NetInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.addr, self.source)
    }
}

/// Local address the kernel would use to reach `remote`.
///
/// Connecting a UDP socket only selects a route; nothing is sent.
async fn route_to(remote: SocketAddr) -> std::io::Result<IpAddr> {
    let unspecified = match remote {
        SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
    socket.connect(remote).await?;
    let local = socket.local_addr()?.ip();
    if local.is_unspecified() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "route selected an unspecified address",
        ));
    }
    Ok(local)
}
