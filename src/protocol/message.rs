use crate::error::{BootstrapError, Result};
use crate::protocol::codec::{ADDR_SIZE, decode_addr, encode_addr};
use crate::types::{Rank, Tag};
use std::net::SocketAddr;

/// Size of an encoded `Registration` record.
pub const REGISTRATION_SIZE: usize = 8 + 2 * ADDR_SIZE;

/// Size of an encoded `PeerHeader`.
pub const PEER_HEADER_SIZE: usize = 8;

/// A rank's check-in with the root service.
///
/// ```text
/// [0..4]   rank: u32 LE
/// [4..8]   world_size: u32 LE
/// [8..36]  root_listen_addr (root sends the successor assignment here)
/// [36..64] peer_listen_addr (public socket, handed to the predecessor)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub rank: Rank,
    pub world_size: u32,
    pub root_listen_addr: SocketAddr,
    pub peer_listen_addr: SocketAddr,
}

impl Registration {
    pub fn encode(&self) -> [u8; REGISTRATION_SIZE] {
        let mut buf = [0u8; REGISTRATION_SIZE];
        buf[0..4].copy_from_slice(&self.rank.to_le_bytes());
        buf[4..8].copy_from_slice(&self.world_size.to_le_bytes());
        buf[8..8 + ADDR_SIZE].copy_from_slice(&encode_addr(&self.root_listen_addr));
        buf[8 + ADDR_SIZE..].copy_from_slice(&encode_addr(&self.peer_listen_addr));
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != REGISTRATION_SIZE {
            return Err(BootstrapError::DecodeFailed(format!(
                "registration record is {} bytes, expected {REGISTRATION_SIZE}",
                buf.len()
            )));
        }
        Ok(Self {
            rank: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            world_size: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            root_listen_addr: decode_addr(&buf[8..8 + ADDR_SIZE])?,
            peer_listen_addr: decode_addr(&buf[8 + ADDR_SIZE..])?,
        })
    }
}

/// Routing header sent ahead of every point-to-point payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerHeader {
    pub sender: Rank,
    pub tag: Tag,
}

impl PeerHeader {
    pub fn encode(&self) -> [u8; PEER_HEADER_SIZE] {
        let mut buf = [0u8; PEER_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.sender.to_le_bytes());
        buf[4..8].copy_from_slice(&self.tag.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; PEER_HEADER_SIZE]) -> Self {
        Self {
            sender: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            tag: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }

    pub fn matches(&self, peer: Rank, tag: Tag) -> bool {
        self.sender == peer && self.tag == tag
    }
}
