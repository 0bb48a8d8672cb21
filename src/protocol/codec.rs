use crate::error::{BootstrapError, Result};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// Size of an encoded socket address in bytes.
pub const ADDR_SIZE: usize = 28;

const FAMILY_V4: u8 = 4;
const FAMILY_V6: u8 = 6;

/// Encode a socket address into its fixed 28-byte wire form.
///
/// ```text
/// [0]      family: u8 (4 or 6)
/// [1]      reserved: u8 (0)
/// [2..4]   port: u16 LE
/// [4..20]  ip octets (IPv4 uses the first 4)
/// [20..24] flowinfo: u32 LE (IPv6 only)
/// [24..28] scope_id: u32 LE (IPv6 only)
/// ```
///
/// An all-zero record never decodes; it marks an unset slot.
pub fn encode_addr(addr: &SocketAddr) -> [u8; ADDR_SIZE] {
    let mut buf = [0u8; ADDR_SIZE];
    buf[2..4].copy_from_slice(&addr.port().to_le_bytes());
    match addr {
        SocketAddr::V4(v4) => {
            buf[0] = FAMILY_V4;
            buf[4..8].copy_from_slice(&v4.ip().octets());
        }
        SocketAddr::V6(v6) => {
            buf[0] = FAMILY_V6;
            buf[4..20].copy_from_slice(&v6.ip().octets());
            buf[20..24].copy_from_slice(&v6.flowinfo().to_le_bytes());
            buf[24..28].copy_from_slice(&v6.scope_id().to_le_bytes());
        }
    }
    buf
}

/// Decode a 28-byte address record.
pub fn decode_addr(buf: &[u8]) -> Result<SocketAddr> {
    if buf.len() < ADDR_SIZE {
        return Err(BootstrapError::DecodeFailed(format!(
            "address record too short: {} < {ADDR_SIZE}",
            buf.len()
        )));
    }
    let port = u16::from_le_bytes([buf[2], buf[3]]);
    match buf[0] {
        FAMILY_V4 => {
            let ip = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);
            Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }
        FAMILY_V6 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[4..20]);
            let flowinfo = u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]);
            let scope_id = u32::from_le_bytes([buf[24], buf[25], buf[26], buf[27]]);
            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(octets),
                port,
                flowinfo,
                scope_id,
            )))
        }
        0 if is_unset_addr(&buf[..ADDR_SIZE]) => Err(BootstrapError::DecodeFailed(
            "address slot was never filled".into(),
        )),
        other => Err(BootstrapError::DecodeFailed(format!(
            "unknown address family {other}"
        ))),
    }
}

/// True if the record is the all-zero "unset" marker.
pub fn is_unset_addr(buf: &[u8]) -> bool {
    buf.iter().all(|&b| b == 0)
}
