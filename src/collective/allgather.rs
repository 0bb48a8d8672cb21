use crate::collective::helpers::check_layout;
use crate::error::{BootstrapError, Result};
use crate::protocol::codec::{ADDR_SIZE, decode_addr, encode_addr};
use crate::rendezvous::ring::RingLinks;
use crate::types::Rank;
use std::net::SocketAddr;

/// Slots sent and received by `rank` in ring round `round`.
///
/// Round `i` forwards the record that arrived in round `i - 1` (our own in
/// round 0), so slot `(rank - i) mod N` goes out and `(rank - i - 1) mod N`
/// comes in.
pub(crate) fn round_slots(rank: usize, world: usize, round: usize) -> (usize, usize) {
    let send_idx = (rank + world - round) % world;
    let recv_idx = (rank + world - round - 1) % world;
    (send_idx, recv_idx)
}

/// Ring all-gather of fixed-size records over the persistent ring links.
///
/// `buf` holds `world` records of `record_size` bytes with this rank's
/// contribution already at index `rank`; on return every slot is filled.
/// N-1 rounds, each overlapping one send to the successor with one receive
/// from the predecessor.
pub(crate) async fn ring_allgather(
    links: &mut RingLinks,
    rank: Rank,
    world_size: u32,
    buf: &mut [u8],
    record_size: usize,
) -> Result<()> {
    let world = world_size as usize;
    let rank = rank as usize;
    check_layout(buf, world, record_size)?;

    let RingLinks { send, recv } = links;
    for round in 0..world.saturating_sub(1) {
        let (send_idx, recv_idx) = round_slots(rank, world, round);
        let send_data = buf[send_idx * record_size..(send_idx + 1) * record_size].to_vec();
        let slot = &mut buf[recv_idx * record_size..(recv_idx + 1) * record_size];

        let (_, received) = tokio::try_join!(send.send_frame(&send_data), recv.recv_frame_into(slot))?;
        if received != record_size {
            return Err(BootstrapError::SizeMismatch {
                expected: record_size,
                actual: received,
            });
        }
        tracing::trace!(rank, round, send_idx, recv_idx, "bootstrap: allgather round done");
    }
    Ok(())
}

/// Gather one socket address per rank, indexed by rank.
pub(crate) async fn ring_allgather_addrs(
    links: &mut RingLinks,
    rank: Rank,
    world_size: u32,
    addr: SocketAddr,
) -> Result<Vec<SocketAddr>> {
    let mut buf = vec![0u8; world_size as usize * ADDR_SIZE];
    let own = rank as usize * ADDR_SIZE;
    buf[own..own + ADDR_SIZE].copy_from_slice(&encode_addr(&addr));

    ring_allgather(links, rank, world_size, &mut buf, ADDR_SIZE).await?;

    buf.chunks_exact(ADDR_SIZE).map(decode_addr).collect()
}
