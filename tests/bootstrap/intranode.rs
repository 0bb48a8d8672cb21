use super::helpers::run_ranks;
use nexar_bootstrap::{BootstrapError, Rank};

fn expected(group: &[Rank], slice: usize) -> Vec<u8> {
    group
        .iter()
        .flat_map(|&r| std::iter::repeat_n(r as u8 + 10, slice))
        .collect()
}

#[tokio::test]
async fn test_disjoint_node_groups() {
    run_ranks(5, |b| async move {
        let rank = b.rank();
        let group: Vec<Rank> = if rank % 2 == 0 { vec![0, 2, 4] } else { vec![1, 3] };
        let slice = 4;
        let idx = group.iter().position(|&r| r == rank).unwrap();

        let mut buf = vec![0u8; group.len() * slice];
        buf[idx * slice..(idx + 1) * slice].fill(rank as u8 + 10);
        b.intra_node_all_gather(&group, &mut buf, slice).await.unwrap();

        assert_eq!(buf, expected(&group, slice));
    })
    .await;
}

#[tokio::test]
async fn test_whole_world_group() {
    run_ranks(4, |b| async move {
        let group: Vec<Rank> = (0..4).collect();
        let rank = b.rank() as usize;
        let mut buf = vec![0u8; 4 * 3];
        buf[rank * 3..(rank + 1) * 3].fill(rank as u8 + 10);
        b.intra_node_all_gather(&group, &mut buf, 3).await.unwrap();
        assert_eq!(buf, expected(&group, 3));
    })
    .await;
}

#[tokio::test]
async fn test_single_member_is_noop() {
    run_ranks(2, |b| async move {
        let mut buf = vec![b.rank() as u8; 8];
        b.intra_node_all_gather(&[b.rank()], &mut buf, 8).await.unwrap();
        assert_eq!(buf, vec![b.rank() as u8; 8]);
        assert_eq!(b.pending_unexpected().await, 0);
    })
    .await;
}

#[tokio::test]
async fn test_wrong_layout_rejected() {
    run_ranks(2, |b| async move {
        let mut buf = vec![0u8; 5];
        let err = b.intra_node_all_gather(&[0, 1], &mut buf, 4).await.unwrap_err();
        assert!(matches!(err, BootstrapError::SizeMismatch { expected: 8, actual: 5 }));
    })
    .await;
}
