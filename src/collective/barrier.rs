use crate::client::Bootstrap;
use crate::collective::helpers::{ceil_log2, subset_index};
use crate::error::Result;
use crate::types::{Rank, Tag};

/// Size of the token exchanged in each barrier round.
const TOKEN_SIZE: usize = 4;

/// Dissemination schedule for participant `idx` of `n`: one
/// `(send_to, recv_from)` pair of subset indices per round.
///
/// Round `k` uses distance `2^k`; there are `ceil(log2(n))` rounds and none
/// at all for `n <= 1`.
pub fn dissemination_schedule(idx: usize, n: usize) -> Vec<(usize, usize)> {
    let mut rounds = Vec::with_capacity(ceil_log2(n as u32) as usize);
    let mut mask = 1;
    while mask < n {
        rounds.push(((idx + mask) % n, (idx + n - mask) % n));
        mask <<= 1;
    }
    rounds
}

/// Dissemination barrier over the participants `ranks`, all rounds tagged
/// with `tag`.
///
/// `tag` must not be in use by any other concurrent exchange between these
/// ranks; the barrier does not namespace it.
pub(crate) async fn dissemination_barrier(bootstrap: &Bootstrap, ranks: &[Rank], tag: Tag) -> Result<()> {
    let idx = subset_index(ranks, bootstrap.rank(), bootstrap.world_size())?;
    let token = (idx as u32).to_le_bytes();

    for (round, (dst, src)) in dissemination_schedule(idx, ranks.len()).into_iter().enumerate() {
        let (dst, src) = (ranks[dst], ranks[src]);
        let mut recv_token = [0u8; TOKEN_SIZE];
        tokio::try_join!(
            bootstrap.send(dst, tag, &token),
            bootstrap.recv(src, tag, &mut recv_token),
        )?;
        tracing::trace!(rank = bootstrap.rank(), round, dst, src, tag, "bootstrap: barrier round done");
    }
    Ok(())
}
