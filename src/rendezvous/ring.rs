use crate::config::BootstrapConfig;
use crate::error::Result;
use crate::protocol::codec::{ADDR_SIZE, decode_addr};
use crate::protocol::message::Registration;
use crate::rendezvous::RendezvousHandle;
use crate::transport::{BootstrapListener, BootstrapStream, ConnectPolicy, NetInterface};
use crate::types::{AbortFlag, Rank};
use std::time::Duration;

/// The two persistent ring connections of one rank.
pub(crate) struct RingLinks {
    /// To `(rank + 1) % N`.
    pub(crate) send: BootstrapStream,
    /// From `(rank - 1 + N) % N`.
    pub(crate) recv: BootstrapStream,
}

impl RingLinks {
    pub(crate) async fn close(self) -> Result<()> {
        let send = self.send.close().await;
        let recv = self.recv.close().await;
        send.and(recv)
    }
}

/// Session parameters every step of ring establishment needs.
pub(crate) struct RingPlan<'a> {
    pub(crate) config: &'a BootstrapConfig,
    pub(crate) handle: RendezvousHandle,
    pub(crate) iface: NetInterface,
    pub(crate) abort: &'a AbortFlag,
    pub(crate) rank: Rank,
    pub(crate) world_size: u32,
}

/// How long `rank` waits before registering. Only worlds strictly larger
/// than the threshold stagger, by one millisecond per rank.
pub(crate) fn stagger_delay(config: &BootstrapConfig, rank: Rank, world_size: u32) -> Option<Duration> {
    (world_size > config.stagger_threshold).then(|| Duration::from_millis(u64::from(rank)))
}

/// Register with the root, learn the successor, and wire up the ring.
///
/// Returns the public listener (kept for point-to-point traffic) and the
/// ring links. The order of steps matters: every rank connects to its
/// successor before accepting from its predecessor, so no rank can wait on
/// a peer that is itself waiting.
pub(crate) async fn establish(plan: RingPlan<'_>) -> Result<(BootstrapListener, RingLinks)> {
    let RingPlan {
        config,
        handle,
        iface,
        abort,
        rank,
        world_size,
    } = plan;
    let magic = handle.magic;
    let policy = ConnectPolicy::from(config);

    let public = BootstrapListener::bind(iface.addr, magic, abort.clone()).await?;
    let root_only = BootstrapListener::bind(iface.addr, magic, abort.clone()).await?;

    if let Some(delay) = stagger_delay(config, rank, world_size) {
        tracing::debug!(rank, "bootstrap: staggering registration by {delay:?}");
        tokio::time::sleep(delay).await;
    }

    let registration = Registration {
        rank,
        world_size,
        root_listen_addr: root_only.local_addr(),
        peer_listen_addr: public.local_addr(),
    };
    let mut to_root = BootstrapStream::connect(handle.addr, magic, policy, abort).await?;
    to_root.send_frame(&registration.encode()).await?;
    to_root.close().await?;
    tracing::trace!(rank, root = %handle.addr, "bootstrap: registered with root");

    let mut from_root = root_only.accept().await?;
    let successor = from_root.recv_record::<ADDR_SIZE>().await?;
    from_root.close().await?;
    drop(root_only);
    let successor = decode_addr(&successor)?;
    tracing::trace!(rank, %successor, "bootstrap: received ring successor");

    let send = BootstrapStream::connect(successor, magic, policy, abort).await?;
    let recv = public.accept().await?;
    tracing::debug!(
        rank,
        next = %successor,
        prev = %recv.peer_addr(),
        "bootstrap: ring connections established"
    );

    Ok((public, RingLinks { send, recv }))
}
