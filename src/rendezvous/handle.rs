use crate::error::{BootstrapError, Result};
use crate::protocol::codec::{ADDR_SIZE, decode_addr, encode_addr};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Size of an encoded `RendezvousHandle`.
pub const HANDLE_SIZE: usize = 8 + ADDR_SIZE;

/// Shared identity of one bootstrap session.
///
/// Every process of the job must hold the same handle. `magic` is written
/// at the start of every connection so that traffic from another session
/// reusing the address is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendezvousHandle {
    pub magic: u64,
    pub addr: SocketAddr,
}

impl RendezvousHandle {
    pub fn new(magic: u64, addr: SocketAddr) -> Self {
        Self { magic, addr }
    }

    /// Fixed 36-byte form, for shared files or foreign launchers.
    pub fn to_bytes(&self) -> [u8; HANDLE_SIZE] {
        let mut buf = [0u8; HANDLE_SIZE];
        buf[..8].copy_from_slice(&self.magic.to_le_bytes());
        buf[8..].copy_from_slice(&encode_addr(&self.addr));
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() != HANDLE_SIZE {
            return Err(BootstrapError::DecodeFailed(format!(
                "handle is {} bytes, expected {HANDLE_SIZE}",
                buf.len()
            )));
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&buf[..8]);
        Ok(Self {
            magic: u64::from_le_bytes(magic),
            addr: decode_addr(&buf[8..])?,
        })
    }

    /// 64-bit digest identifying the session in logs.
    pub fn hash(&self) -> u64 {
        let mut h: u64 = 0xdead_beef;
        for b in self.to_bytes() {
            h ^= h >> 32;
            h = h.wrapping_mul(0x8db3_db47_fa29_94ad);
            h = h.wrapping_add(u64::from(b));
        }
        h
    }

    /// `hash()` as fixed-width hex, the form used in log lines.
    pub fn session_id(&self) -> String {
        format!("{:016x}", self.hash())
    }
}

impl fmt::Display for RendezvousHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}@{}", self.magic, self.addr)
    }
}

impl FromStr for RendezvousHandle {
    type Err = BootstrapError;

    /// Parse the `<magic hex>@<socket addr>` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| BootstrapError::InvalidAddress {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let (magic, addr) = s
            .trim()
            .split_once('@')
            .ok_or_else(|| invalid("expected <magic>@<addr>"))?;
        let magic = u64::from_str_radix(magic, 16).map_err(|_| invalid("magic is not hex"))?;
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|_| invalid("not a socket address"))?;
        Ok(Self::new(magic, addr))
    }
}

/// Resolve a human-supplied rendezvous address.
///
/// Accepts `<ipv4>:<port>`, `[<ipv6>]:<port>` and `<hostname>:<port>`.
pub async fn parse_rendezvous_addr(input: &str) -> Result<SocketAddr> {
    let trimmed = input.trim();
    let invalid = |reason: String| BootstrapError::InvalidAddress {
        input: input.to_string(),
        reason,
    };

    if let Ok(addr) = trimmed.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let (host, port) = trimmed
        .rsplit_once(':')
        .ok_or_else(|| invalid("missing port".into()))?;
    if host.is_empty() {
        return Err(invalid("missing host".into()));
    }
    if host.contains(':') && !host.starts_with('[') {
        return Err(invalid("IPv6 addresses must be bracketed".into()));
    }
    port.parse::<u16>()
        .map_err(|_| invalid(format!("bad port {port:?}")))?;

    let mut addrs = tokio::net::lookup_host(trimmed)
        .await
        .map_err(|e| invalid(format!("lookup failed: {e}")))?;
    addrs
        .next()
        .ok_or_else(|| invalid("host resolved to no addresses".into()))
}
