use super::helpers::run_ranks;
use nexar_bootstrap::collective::dissemination_schedule;
use nexar_bootstrap::{BootstrapError, Rank};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

async fn barrier_holds_everyone(world: u32) {
    let arrived = Arc::new(AtomicU32::new(0));
    run_ranks(world, move |b| {
        let arrived = Arc::clone(&arrived);
        async move {
            // Stagger arrival so late ranks really are late.
            tokio::time::sleep(Duration::from_millis(10 * b.rank() as u64)).await;
            arrived.fetch_add(1, Ordering::SeqCst);
            b.barrier_all(1).await.unwrap();
            assert_eq!(arrived.load(Ordering::SeqCst), world, "rank {} left early", b.rank());
        }
    })
    .await;
}

#[tokio::test]
async fn test_barrier_1() {
    barrier_holds_everyone(1).await;
}

#[tokio::test]
async fn test_barrier_2() {
    barrier_holds_everyone(2).await;
}

#[tokio::test]
async fn test_barrier_4() {
    barrier_holds_everyone(4).await;
}

#[tokio::test]
async fn test_barrier_7() {
    barrier_holds_everyone(7).await;
}

#[tokio::test]
async fn test_single_rank_barrier_sends_nothing() {
    assert!(dissemination_schedule(0, 1).is_empty());
    run_ranks(3, |b| async move {
        b.barrier(&[b.rank()], 5).await.unwrap();
        assert_eq!(b.pending_unexpected().await, 0);
    })
    .await;
}

#[tokio::test]
async fn test_repeated_barriers_with_distinct_tags() {
    run_ranks(5, |b| async move {
        for tag in 100..110 {
            b.barrier_all(tag).await.unwrap();
        }
    })
    .await;
}

#[tokio::test]
async fn test_subset_barrier() {
    run_ranks(4, |b| async move {
        let group: [Rank; 2] = [3, 1];
        if group.contains(&b.rank()) {
            b.barrier(&group, 8).await.unwrap();
        }
    })
    .await;
}

#[tokio::test]
async fn test_barrier_requires_membership() {
    run_ranks(3, |b| async move {
        if b.rank() == 0 {
            let err = b.barrier(&[1, 2], 3).await.unwrap_err();
            assert!(matches!(err, BootstrapError::InvalidRank { rank: 0, .. }));
        }
    })
    .await;
}
