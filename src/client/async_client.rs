use crate::client::unexpected::UnexpectedQueue;
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::rendezvous::RendezvousHandle;
use crate::rendezvous::RootService;
use crate::rendezvous::ring::RingLinks;
use crate::transport::{BootstrapListener, BootstrapStream, ConnectPolicy};
use crate::types::{AbortFlag, Rank};
use std::net::SocketAddr;
use tokio::sync::Mutex;

/// Everything ring establishment produces, handed over to [`Bootstrap`].
pub(crate) struct SessionParts {
    pub(crate) rank: Rank,
    pub(crate) world_size: u32,
    pub(crate) handle: RendezvousHandle,
    pub(crate) config: BootstrapConfig,
    pub(crate) abort: AbortFlag,
    pub(crate) listener: BootstrapListener,
    pub(crate) ring: RingLinks,
    pub(crate) peer_addrs: Vec<SocketAddr>,
    pub(crate) root: Option<RootService>,
}

/// Receiving side of the point-to-point channel.
pub(super) struct PeerInbox {
    pub(super) listener: BootstrapListener,
    pub(super) unexpected: UnexpectedQueue<BootstrapStream>,
}

/// A joined bootstrap session: one rank's view of the ring.
///
/// Holds the two persistent ring connections, the public listener that
/// receives point-to-point traffic, every peer's public address and, on
/// the process that hosts it, the root service. Collective calls must be
/// issued by all participating ranks in the same order.
///
/// # Example
///
/// ```no_run
/// use nexar_bootstrap::Bootstrap;
///
/// # async fn example() -> nexar_bootstrap::Result<()> {
/// let ranks = Bootstrap::bootstrap_local(4).await?;
/// assert_eq!(ranks[2].rank(), 2);
/// assert_eq!(ranks[2].peer_addrs().len(), 4);
/// for b in ranks {
///     b.close().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Bootstrap {
    pub(super) rank: Rank,
    pub(super) world_size: u32,
    pub(super) handle: RendezvousHandle,
    pub(super) policy: ConnectPolicy,
    pub(super) abort: AbortFlag,
    pub(super) listen_addr: SocketAddr,
    /// Public listen address of every rank, indexed by rank.
    pub(super) peer_addrs: Vec<SocketAddr>,
    pub(super) ring: Mutex<RingLinks>,
    pub(super) inbox: Mutex<PeerInbox>,
    /// Joined on `close`, aborted on `abort`.
    root: Option<RootService>,
}

impl Bootstrap {
    pub(crate) fn new(parts: SessionParts) -> Self {
        let SessionParts {
            rank,
            world_size,
            handle,
            config,
            abort,
            listener,
            ring,
            peer_addrs,
            root,
        } = parts;
        Self {
            rank,
            world_size,
            handle,
            policy: ConnectPolicy::from(&config),
            abort,
            listen_addr: listener.local_addr(),
            peer_addrs,
            ring: Mutex::new(ring),
            inbox: Mutex::new(PeerInbox {
                listener,
                unexpected: UnexpectedQueue::default(),
            }),
            root,
        }
    }

    /// This process's rank (0-indexed).
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Total number of ranks in the session.
    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    pub fn handle(&self) -> RendezvousHandle {
        self.handle
    }

    pub fn abort_flag(&self) -> &AbortFlag {
        &self.abort
    }

    /// The public address peers send point-to-point messages to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Public listen address of every rank, indexed by rank.
    pub fn peer_addrs(&self) -> &[SocketAddr] {
        &self.peer_addrs
    }

    pub fn peer_addr(&self, rank: Rank) -> Result<SocketAddr> {
        self.peer_addrs
            .get(rank as usize)
            .copied()
            .ok_or(BootstrapError::InvalidRank {
                rank,
                world_size: self.world_size,
            })
    }

    /// Number of received messages still waiting for a matching `recv`.
    pub async fn pending_unexpected(&self) -> usize {
        self.inbox.lock().await.unexpected.len()
    }

    /// Tear down the session.
    ///
    /// Closes the ring, releases every socket and waits for the root
    /// service when this process hosts it. Unclaimed point-to-point
    /// messages are an error unless the abort flag is set.
    pub async fn close(self) -> Result<()> {
        let Self {
            rank,
            abort,
            ring,
            inbox,
            root,
            ..
        } = self;

        let unexpected = inbox.into_inner().unexpected;
        let pending = unexpected.len();
        let leak_check = if unexpected.is_empty() {
            Ok(())
        } else if abort.is_set() {
            tracing::warn!(rank, pending, "bootstrap: closing with unclaimed messages while aborting");
            Ok(())
        } else {
            Err(BootstrapError::UnexpectedMessagesPending { count: pending })
        };

        let ring_closed = ring.into_inner().close().await;
        let root_joined = match root {
            Some(root) => root.join().await,
            None => Ok(()),
        };
        tracing::debug!(rank, "bootstrap: session closed");

        leak_check.and(ring_closed).and(root_joined)
    }

    /// Forced teardown: release everything best effort, skip the leak check
    /// and stop the root service without waiting for it.
    pub fn abort(self) {
        let Self { rank, root, .. } = self;
        if let Some(root) = root {
            root.abort();
        }
        tracing::debug!(rank, "bootstrap: session aborted");
    }
}
