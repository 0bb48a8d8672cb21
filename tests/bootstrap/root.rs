use nexar_bootstrap::protocol::codec::{ADDR_SIZE, decode_addr};
use nexar_bootstrap::protocol::message::Registration;
use nexar_bootstrap::transport::{BootstrapListener, BootstrapStream, ConnectPolicy};
use nexar_bootstrap::{AbortFlag, BootstrapConfig, BootstrapError, RootService};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const MAGIC: u64 = 0x5eed_0001;

fn policy() -> ConnectPolicy {
    ConnectPolicy {
        retries: 10,
        interval: Duration::from_millis(10),
    }
}

async fn spawn_root() -> RootService {
    let listener = BootstrapListener::bind(LOOPBACK, MAGIC, AbortFlag::new())
        .await
        .unwrap();
    RootService::spawn(listener, &BootstrapConfig::local())
}

async fn register(root: SocketAddr, magic: u64, reg: Registration) {
    let mut conn = BootstrapStream::connect(root, magic, policy(), &AbortFlag::new())
        .await
        .unwrap();
    conn.send_frame(&reg.encode()).await.unwrap();
    conn.close().await.unwrap();
}

fn fake_registration(rank: u32, world_size: u32) -> Registration {
    Registration {
        rank,
        world_size,
        root_listen_addr: SocketAddr::new(LOOPBACK, 21000 + rank as u16),
        peer_listen_addr: SocketAddr::new(LOOPBACK, 22000 + rank as u16),
    }
}

#[tokio::test]
async fn test_duplicate_check_in_fails_session() {
    let root = spawn_root().await;
    let addr = root.local_addr();
    register(addr, MAGIC, fake_registration(0, 3)).await;
    register(addr, MAGIC, fake_registration(0, 3)).await;

    let err = tokio::time::timeout(Duration::from_secs(5), root.join())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::DuplicateCheckIn {
            rank: 0,
            world_size: 3
        }
    ));
    assert!(err.is_protocol_violation());
}

#[tokio::test]
async fn test_rank_count_mismatch_fails_session() {
    let root = spawn_root().await;
    let addr = root.local_addr();
    register(addr, MAGIC, fake_registration(0, 4)).await;
    register(addr, MAGIC, fake_registration(1, 5)).await;

    let err = tokio::time::timeout(Duration::from_secs(5), root.join())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::RankCountMismatch {
            expected: 4,
            actual: 5
        }
    ));
}

#[tokio::test]
async fn test_out_of_range_rank_fails_session() {
    let root = spawn_root().await;
    register(root.local_addr(), MAGIC, fake_registration(2, 2)).await;
    let err = root.join().await.unwrap_err();
    assert!(matches!(err, BootstrapError::InvalidRank { rank: 2, .. }));
}

/// Register three hand-made ranks out of order and check that the
/// successor assignments close a single cycle.
#[tokio::test]
async fn test_fan_out_forms_single_cycle() {
    let root = spawn_root().await;
    let world = 3u32;

    let mut root_listeners = Vec::new();
    let mut regs = Vec::new();
    for rank in 0..world {
        let l = BootstrapListener::bind(LOOPBACK, MAGIC, AbortFlag::new())
            .await
            .unwrap();
        regs.push(Registration {
            rank,
            world_size: world,
            root_listen_addr: l.local_addr(),
            peer_listen_addr: SocketAddr::new(LOOPBACK, 23000 + rank as u16),
        });
        root_listeners.push(l);
    }
    for rank in [2usize, 0, 1] {
        register(root.local_addr(), MAGIC, regs[rank]).await;
    }

    let mut successor = Vec::new();
    for l in &root_listeners {
        let mut conn = l.accept().await.unwrap();
        let rec: [u8; ADDR_SIZE] = conn.recv_record().await.unwrap();
        let next = decode_addr(&rec).unwrap();
        successor.push((next.port() - 23000) as usize);
    }
    assert_eq!(successor, vec![1, 2, 0]);

    // Walk the cycle from rank 0: it must visit every rank exactly once.
    let mut seen = vec![false; world as usize];
    let mut at = 0;
    for _ in 0..world {
        assert!(!seen[at]);
        seen[at] = true;
        at = successor[at];
    }
    assert_eq!(at, 0);
    assert!(seen.iter().all(|&s| s));

    root.join().await.unwrap();
}

#[tokio::test]
async fn test_foreign_magic_is_ignored() {
    let root = spawn_root().await;
    let addr = root.local_addr();
    let root_listener = BootstrapListener::bind(LOOPBACK, MAGIC, AbortFlag::new())
        .await
        .unwrap();
    let reg = Registration {
        rank: 0,
        world_size: 1,
        root_listen_addr: root_listener.local_addr(),
        peer_listen_addr: SocketAddr::new(LOOPBACK, 24000),
    };

    // Another session's rank 0 shows up first; the root must not count it.
    let mut stray = BootstrapStream::connect(addr, MAGIC + 1, policy(), &AbortFlag::new())
        .await
        .unwrap();
    // The root may already have hung up on it, so the write can fail.
    let _ = stray.send_frame(&fake_registration(0, 1).encode()).await;

    register(addr, MAGIC, reg).await;
    let mut conn = root_listener.accept().await.unwrap();
    let rec: [u8; ADDR_SIZE] = conn.recv_record().await.unwrap();
    assert_eq!(decode_addr(&rec).unwrap(), reg.peer_listen_addr);
    root.join().await.unwrap();
    drop(stray);
}

#[tokio::test]
async fn test_dropping_unfinished_root_aborts_it() {
    let root = spawn_root().await;
    let addr = root.local_addr();
    assert!(!root.is_finished());
    drop(root);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = BootstrapStream::connect(
        addr,
        MAGIC,
        ConnectPolicy {
            retries: 0,
            interval: Duration::from_millis(1),
        },
        &AbortFlag::new(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, BootstrapError::ConnectionFailed { .. }));
}
