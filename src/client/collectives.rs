use crate::collective::allgather::{ring_allgather, ring_allgather_addrs};
use crate::collective::barrier::dissemination_barrier;
use crate::collective::intranode::intra_node_allgather;
use crate::error::Result;
use crate::types::{Rank, Tag};
use std::net::SocketAddr;

use super::Bootstrap;

impl Bootstrap {
    /// Ring all-gather of one `record_size` record per rank.
    ///
    /// `buf` must hold `world_size * record_size` bytes with this rank's
    /// record already at index `rank`. Every rank must call this.
    pub async fn all_gather(&self, buf: &mut [u8], record_size: usize) -> Result<()> {
        let mut ring = self.ring.lock().await;
        ring_allgather(&mut ring, self.rank, self.world_size, buf, record_size).await
    }

    /// Exchange one socket address per rank, returned indexed by rank.
    pub async fn all_gather_addrs(&self, addr: SocketAddr) -> Result<Vec<SocketAddr>> {
        let mut ring = self.ring.lock().await;
        ring_allgather_addrs(&mut ring, self.rank, self.world_size, addr).await
    }

    /// Dissemination barrier among `ranks`, which must include this rank.
    ///
    /// `tag` is used for every round; pick one no other concurrent exchange
    /// between these ranks uses.
    pub async fn barrier(&self, ranks: &[Rank], tag: Tag) -> Result<()> {
        dissemination_barrier(self, ranks, tag).await
    }

    /// [`Bootstrap::barrier`] over every rank of the session.
    pub async fn barrier_all(&self, tag: Tag) -> Result<()> {
        let ranks: Vec<Rank> = (0..self.world_size).collect();
        self.barrier(&ranks, tag).await
    }

    /// Direct all-gather among the subset `ranks` (typically the ranks of
    /// one host).
    ///
    /// `buf` holds one `slice_size` slice per entry of `ranks`, in the same
    /// order, with this rank's slice already in place. Rounds are tagged
    /// `1..ranks.len()`.
    pub async fn intra_node_all_gather(
        &self,
        ranks: &[Rank],
        buf: &mut [u8],
        slice_size: usize,
    ) -> Result<()> {
        intra_node_allgather(self, ranks, buf, slice_size).await
    }
}
