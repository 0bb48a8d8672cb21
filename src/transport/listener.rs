use crate::error::{BootstrapError, Result};
use crate::transport::connection::{BootstrapStream, MAGIC_SIZE};
use crate::types::AbortFlag;
use std::net::{IpAddr, SocketAddr};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// Listens for bootstrap connections belonging to one session.
///
/// Every accepted connection must open with the session magic; anything
/// else is dropped and accepting continues.
pub struct BootstrapListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    magic: u64,
    abort: AbortFlag,
}

impl BootstrapListener {
    /// Bind on an ephemeral port of `ip`.
    pub async fn bind(ip: IpAddr, magic: u64, abort: AbortFlag) -> Result<Self> {
        Self::bind_addr(SocketAddr::new(ip, 0), magic, abort).await
    }

    /// Bind on an exact address.
    pub async fn bind_addr(addr: SocketAddr, magic: u64, abort: AbortFlag) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BootstrapError::transport_with_source(format!("bind {addr}"), e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BootstrapError::transport_with_source("local_addr", e))?;
        Ok(Self {
            listener,
            local_addr,
            magic,
            abort,
        })
    }

    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The session magic accepted connections must carry.
    pub fn magic(&self) -> u64 {
        self.magic
    }

    /// Accept the next connection carrying this session's magic.
    pub async fn accept(&self) -> Result<BootstrapStream> {
        loop {
            let (mut stream, peer_addr) = tokio::select! {
                r = self.listener.accept() => r
                    .map_err(|e| BootstrapError::transport_with_source("accept", e))?,
                _ = self.abort.cancelled() => return Err(BootstrapError::Aborted),
            };

            // A peer that connects and never writes must not outlive the abort flag.
            let mut magic = [0u8; MAGIC_SIZE];
            let read = tokio::select! {
                r = stream.read_exact(&mut magic) => r,
                _ = self.abort.cancelled() => return Err(BootstrapError::Aborted),
            };
            if let Err(e) = read {
                tracing::warn!(%peer_addr, "dropping connection that closed before magic: {e}");
                continue;
            }
            let magic = u64::from_le_bytes(magic);
            if magic != self.magic {
                tracing::warn!(
                    %peer_addr,
                    "dropping connection with wrong magic {magic:#x} (expected {:#x})",
                    self.magic
                );
                continue;
            }

            stream
                .set_nodelay(true)
                .map_err(|e| BootstrapError::transport_with_source("set_nodelay", e))?;
            return Ok(BootstrapStream::from_accepted(stream, peer_addr));
        }
    }
}
