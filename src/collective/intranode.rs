use crate::client::Bootstrap;
use crate::collective::helpers::{check_layout, subset_index};
use crate::error::{BootstrapError, Result};
use crate::types::{Rank, Tag};

/// Direct all-gather among `ranks` over point-to-point messages.
///
/// `buf` holds one `slice_size` slice per participant in subset order, with
/// this rank's slice already in place. Round `i` sends our slice to the
/// participant `i` places ahead and receives from the one `i` places
/// behind, tagged `i`, writing straight into the sender's slot.
pub(crate) async fn intra_node_allgather(
    bootstrap: &Bootstrap,
    ranks: &[Rank],
    buf: &mut [u8],
    slice_size: usize,
) -> Result<()> {
    let n = ranks.len();
    let idx = subset_index(ranks, bootstrap.rank(), bootstrap.world_size())?;
    check_layout(buf, n, slice_size)?;
    if n <= 1 {
        return Ok(());
    }

    let own = buf[idx * slice_size..(idx + 1) * slice_size].to_vec();
    for i in 1..n {
        let dst = ranks[(idx + i) % n];
        let src_idx = (idx + n - i) % n;
        let src = ranks[src_idx];
        let slot = &mut buf[src_idx * slice_size..(src_idx + 1) * slice_size];

        let (_, received) = tokio::try_join!(
            bootstrap.send(dst, i as Tag, &own),
            bootstrap.recv(src, i as Tag, slot),
        )?;
        if received != slice_size {
            return Err(BootstrapError::SizeMismatch {
                expected: slice_size,
                actual: received,
            });
        }
    }
    Ok(())
}
