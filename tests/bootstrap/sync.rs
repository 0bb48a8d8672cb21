use nexar_bootstrap::{BootstrapConfig, BootstrapError, SyncBootstrap};
use std::thread;

#[test]
fn test_sync_session() {
    let sessions = SyncBootstrap::bootstrap_local(3).unwrap();
    let handles: Vec<_> = sessions
        .into_iter()
        .map(|s| {
            thread::spawn(move || {
                let rank = s.rank() as usize;
                assert_eq!(s.world_size(), 3);
                assert_eq!(s.peer_addrs().len(), 3);

                let mut buf = vec![0u8; 3];
                buf[rank] = rank as u8 * 2;
                s.all_gather(&mut buf, 1).unwrap();
                assert_eq!(buf, vec![0, 2, 4]);

                let next = ((rank + 1) % 3) as u32;
                let prev = ((rank + 2) % 3) as u32;
                s.send(next, 6, &[rank as u8]).unwrap();
                let mut msg = [0u8; 1];
                assert_eq!(s.recv(prev, 6, &mut msg).unwrap(), 1);
                assert_eq!(msg[0], prev as u8);

                s.barrier_all(2).unwrap();
                s.close().unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn test_sync_generated_handle_session() {
    let world = 3u32;
    let (tx, rx) = std::sync::mpsc::channel();

    let root = thread::spawn(move || {
        let rv = SyncBootstrap::create(BootstrapConfig::local()).unwrap();
        assert_eq!(rv.root_addr(), Some(rv.handle().addr));
        for _ in 1..world {
            tx.send(rv.handle()).unwrap();
        }
        let handle = rv.handle();
        let s = rv.join(0, world).unwrap();
        assert_eq!(s.handle(), handle);
        exercise(s);
    });

    let mut peers = Vec::new();
    for rank in 1..world {
        let handle = rx.recv().unwrap();
        peers.push(thread::spawn(move || {
            let s = SyncBootstrap::from_handle(BootstrapConfig::local(), handle, rank, world).unwrap();
            assert_eq!(s.handle(), handle);
            exercise(s);
        }));
    }

    root.join().unwrap();
    for p in peers {
        p.join().unwrap();
    }
}

/// Accessors, the address exchange and the unexpected queue through the
/// blocking API.
fn exercise(s: SyncBootstrap) {
    let rank = s.rank();
    let world = s.world_size();
    assert_eq!(s.peer_addr(rank).unwrap(), s.listen_addr());
    assert!(matches!(
        s.peer_addr(world),
        Err(BootstrapError::InvalidRank { .. })
    ));

    let addrs = s.all_gather_addrs(s.listen_addr()).unwrap();
    assert_eq!(addrs, s.peer_addrs());

    // Rank 1 sends tag 9 then tag 8; rank 0 asks for tag 8 first, so the
    // tag 9 message waits in the unexpected queue.
    match rank {
        0 => {
            let mut buf = [0u8; 1];
            assert_eq!(s.recv(1, 8, &mut buf).unwrap(), 1);
            assert_eq!(buf[0], 8);
            assert_eq!(s.pending_unexpected(), 1);
            assert_eq!(s.recv(1, 9, &mut buf).unwrap(), 1);
            assert_eq!(buf[0], 9);
        }
        1 => {
            s.send(0, 9, &[9]).unwrap();
            s.send(0, 8, &[8]).unwrap();
        }
        _ => {}
    }
    assert_eq!(s.pending_unexpected(), 0);

    s.barrier_all(4).unwrap();
    s.close().unwrap();
}
