use crate::error::{BootstrapError, Result};
use crate::types::Rank;
use std::collections::HashSet;

/// Integer ceiling of log2(n). Returns 0 for n <= 1.
pub(crate) fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        return 0;
    }
    u32::BITS - (n - 1).leading_zeros()
}

/// Position of `rank` within the participant list `ranks`.
///
/// Every entry must be a distinct rank of the session and `rank` must
/// appear in the list.
pub(crate) fn subset_index(ranks: &[Rank], rank: Rank, world_size: u32) -> Result<usize> {
    if let Some(&bad) = ranks.iter().find(|&&r| r >= world_size) {
        return Err(BootstrapError::InvalidRank {
            rank: bad,
            world_size,
        });
    }
    let mut seen = HashSet::with_capacity(ranks.len());
    if let Some(&dup) = ranks.iter().find(|&&r| !seen.insert(r)) {
        return Err(BootstrapError::InvalidRank {
            rank: dup,
            world_size,
        });
    }
    ranks
        .iter()
        .position(|&r| r == rank)
        .ok_or(BootstrapError::InvalidRank {
            rank,
            world_size: ranks.len() as u32,
        })
}

/// Check that `buf` holds exactly `count` records of `record_size` bytes.
pub(crate) fn check_layout(buf: &[u8], count: usize, record_size: usize) -> Result<()> {
    let expected = count
        .checked_mul(record_size)
        .ok_or(BootstrapError::SizeMismatch {
            expected: usize::MAX,
            actual: buf.len(),
        })?;
    if buf.len() != expected {
        return Err(BootstrapError::SizeMismatch {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}
