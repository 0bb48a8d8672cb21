use super::helpers::run_ranks;
use nexar_bootstrap::{Bootstrap, BootstrapConfig, Rendezvous};
use std::collections::HashSet;

/// Form a `world`-rank loopback session by hand with `config` on every rank
/// and return each rank's address table after an address all-gather.
async fn join_with_config(config: BootstrapConfig, world: u32) -> Vec<Vec<std::net::SocketAddr>> {
    let root = Rendezvous::create(config.clone()).await.unwrap();
    let handle = root.handle();

    let mut tasks = Vec::new();
    let mut root = Some(root);
    for rank in 0..world {
        let config = config.clone();
        let rv = if rank == 0 { root.take() } else { None };
        tasks.push(tokio::spawn(async move {
            let rv = match rv {
                Some(rv) => rv,
                None => Rendezvous::from_handle(config, handle).await.unwrap(),
            };
            let b = rv.join(rank, world).await.unwrap();
            let addrs = b.all_gather_addrs(b.listen_addr()).await.unwrap();
            assert_eq!(addrs, b.peer_addrs());
            b.close().await.unwrap();
            addrs
        }));
    }
    let mut tables = Vec::new();
    for t in tasks {
        tables.push(t.await.unwrap());
    }
    tables
}

#[tokio::test]
async fn test_peer_addrs_agree_for_small_worlds() {
    for world in 1..=5u32 {
        let sessions = Bootstrap::bootstrap_local(world).await.unwrap();
        assert_eq!(sessions.len(), world as usize);

        let expected: Vec<_> = sessions.iter().map(|s| s.listen_addr()).collect();
        for (r, s) in sessions.iter().enumerate() {
            assert_eq!(s.rank(), r as u32);
            assert_eq!(s.world_size(), world);
            assert_eq!(s.peer_addrs(), expected.as_slice(), "rank {r} of {world}");
            assert_eq!(s.peer_addr(r as u32).unwrap(), s.listen_addr());
        }
        let distinct: HashSet<_> = expected.iter().collect();
        assert_eq!(distinct.len(), world as usize);

        for s in sessions {
            s.close().await.unwrap();
        }
    }
}

#[tokio::test]
async fn test_all_gather_records() {
    for world in 1..=5u32 {
        run_ranks(world, move |b| async move {
            let record = 6;
            let rank = b.rank() as usize;
            let mut buf = vec![0u8; world as usize * record];
            buf[rank * record..(rank + 1) * record].fill(rank as u8 + 1);

            b.all_gather(&mut buf, record).await.unwrap();

            for r in 0..world as usize {
                assert!(
                    buf[r * record..(r + 1) * record].iter().all(|&x| x == r as u8 + 1),
                    "rank {rank} has a bad slot {r}"
                );
            }
        })
        .await;
    }
}

#[tokio::test]
async fn test_all_gather_repeats_on_same_ring() {
    run_ranks(3, |b| async move {
        for round in 0..4u8 {
            let rank = b.rank() as usize;
            let mut buf = vec![0u8; 3 * 2];
            buf[rank * 2] = round;
            buf[rank * 2 + 1] = rank as u8;
            b.all_gather(&mut buf, 2).await.unwrap();
            assert_eq!(buf, vec![round, 0, round, 1, round, 2]);
        }
    })
    .await;
}

#[tokio::test]
async fn test_all_gather_addrs_second_exchange() {
    run_ranks(4, |b| async move {
        // Each rank announces a made-up secondary address derived from its rank.
        let mine = format!("10.1.0.{}:{}", b.rank() + 1, 7000 + b.rank())
            .parse()
            .unwrap();
        let addrs = b.all_gather_addrs(mine).await.unwrap();
        assert_eq!(addrs.len(), 4);
        for (r, a) in addrs.iter().enumerate() {
            assert_eq!(a.port(), 7000 + r as u16);
        }
    })
    .await;
}

#[tokio::test]
async fn test_all_gather_rejects_wrong_buffer() {
    run_ranks(2, |b| async move {
        let mut buf = vec![0u8; 7];
        let err = b.all_gather(&mut buf, 4).await.unwrap_err();
        assert!(matches!(
            err,
            nexar_bootstrap::BootstrapError::SizeMismatch {
                expected: 8,
                actual: 7
            }
        ));
    })
    .await;
}

#[tokio::test]
async fn test_ring_forms_when_registrations_stagger() {
    let config = BootstrapConfig {
        stagger_threshold: 1,
        ..BootstrapConfig::local()
    };
    let tables = join_with_config(config, 3).await;
    assert_eq!(tables.len(), 3);
    assert!(tables.windows(2).all(|w| w[0] == w[1]));
    let distinct: HashSet<_> = tables[0].iter().collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn test_ring_forms_at_stagger_threshold() {
    let config = BootstrapConfig {
        stagger_threshold: 3,
        ..BootstrapConfig::local()
    };
    let tables = join_with_config(config, 3).await;
    assert!(tables.windows(2).all(|w| w[0] == w[1]));
}
