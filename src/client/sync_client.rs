use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::rendezvous::{Rendezvous, RendezvousHandle};
use crate::types::{AbortFlag, Rank, Tag};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Blocking wrapper around [`Bootstrap`](super::Bootstrap).
///
/// Every operation is driven with `block_on` on a multi-threaded runtime.
/// Sessions created together share one runtime so their sockets stay on
/// the reactor that registered them.
pub struct SyncBootstrap {
    inner: super::Bootstrap,
    rt: Arc<Runtime>,
}

fn new_runtime() -> Result<Arc<Runtime>> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map(Arc::new)
        .map_err(|e| BootstrapError::transport_with_source("tokio runtime", e))
}

/// A generated session on the process that hosts the root service, before
/// it joins.
///
/// Publish [`SyncRendezvous::handle`] to the other processes, then call
/// [`SyncRendezvous::join`]. The root service runs on the runtime that the
/// joined [`SyncBootstrap`] keeps driving.
pub struct SyncRendezvous {
    inner: Rendezvous,
    rt: Arc<Runtime>,
}

impl SyncRendezvous {
    pub fn handle(&self) -> RendezvousHandle {
        self.inner.handle()
    }

    /// Address of the root service hosted by this process.
    pub fn root_addr(&self) -> Option<SocketAddr> {
        self.inner.root_addr()
    }

    pub fn with_abort_flag(self, abort: AbortFlag) -> Self {
        let Self { inner, rt } = self;
        Self {
            inner: inner.with_abort_flag(abort),
            rt,
        }
    }

    /// Blocking [`Rendezvous::join`].
    pub fn join(self, rank: Rank, world_size: u32) -> Result<SyncBootstrap> {
        let Self { inner, rt } = self;
        let inner = rt.block_on(inner.join(rank, world_size))?;
        Ok(SyncBootstrap { inner, rt })
    }
}

impl SyncBootstrap {
    /// Generate a fresh handle and start the root service behind it.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nexar_bootstrap::{BootstrapConfig, SyncBootstrap};
    ///
    /// # fn example() -> nexar_bootstrap::Result<()> {
    /// let rv = SyncBootstrap::create(BootstrapConfig::default())?;
    /// println!("{}", rv.handle()); // hand this to ranks 1..n
    /// let b = rv.join(0, 4)?;
    /// b.barrier_all(1)?;
    /// b.close()
    /// # }
    /// ```
    pub fn create(config: BootstrapConfig) -> Result<SyncRendezvous> {
        let rt = new_runtime()?;
        let inner = rt.block_on(Rendezvous::create(config))?;
        Ok(SyncRendezvous { inner, rt })
    }

    /// Blocking [`Bootstrap::bootstrap_local`](super::Bootstrap::bootstrap_local).
    pub fn bootstrap_local(world_size: u32) -> Result<Vec<Self>> {
        let rt = new_runtime()?;
        let sessions = rt.block_on(super::Bootstrap::bootstrap_local(world_size))?;
        Ok(sessions
            .into_iter()
            .map(|inner| Self {
                inner,
                rt: Arc::clone(&rt),
            })
            .collect())
    }

    /// Join a session whose handle was distributed out of band.
    pub fn from_handle(
        config: BootstrapConfig,
        handle: RendezvousHandle,
        rank: Rank,
        world_size: u32,
    ) -> Result<Self> {
        let rt = new_runtime()?;
        let inner = rt.block_on(async {
            Rendezvous::from_handle(config, handle)
                .await?
                .join(rank, world_size)
                .await
        })?;
        Ok(Self { inner, rt })
    }

    /// Join the session at `config.comm_id`; rank 0 hosts the root there.
    pub fn from_config(config: BootstrapConfig, rank: Rank, world_size: u32) -> Result<Self> {
        let rt = new_runtime()?;
        let inner = rt.block_on(async {
            Rendezvous::from_config(config, rank)
                .await?
                .join(rank, world_size)
                .await
        })?;
        Ok(Self { inner, rt })
    }

    pub fn rank(&self) -> Rank {
        self.inner.rank()
    }

    pub fn world_size(&self) -> u32 {
        self.inner.world_size()
    }

    pub fn handle(&self) -> RendezvousHandle {
        self.inner.handle()
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.inner.listen_addr()
    }

    pub fn peer_addrs(&self) -> &[SocketAddr] {
        self.inner.peer_addrs()
    }

    pub fn peer_addr(&self, rank: Rank) -> Result<SocketAddr> {
        self.inner.peer_addr(rank)
    }

    pub fn pending_unexpected(&self) -> usize {
        self.rt.block_on(self.inner.pending_unexpected())
    }

    pub fn all_gather(&self, buf: &mut [u8], record_size: usize) -> Result<()> {
        self.rt.block_on(self.inner.all_gather(buf, record_size))
    }

    pub fn all_gather_addrs(&self, addr: SocketAddr) -> Result<Vec<SocketAddr>> {
        self.rt.block_on(self.inner.all_gather_addrs(addr))
    }

    pub fn send(&self, peer: Rank, tag: Tag, data: &[u8]) -> Result<()> {
        self.rt.block_on(self.inner.send(peer, tag, data))
    }

    pub fn recv(&self, peer: Rank, tag: Tag, buf: &mut [u8]) -> Result<usize> {
        self.rt.block_on(self.inner.recv(peer, tag, buf))
    }

    pub fn barrier(&self, ranks: &[Rank], tag: Tag) -> Result<()> {
        self.rt.block_on(self.inner.barrier(ranks, tag))
    }

    pub fn barrier_all(&self, tag: Tag) -> Result<()> {
        self.rt.block_on(self.inner.barrier_all(tag))
    }

    pub fn intra_node_all_gather(&self, ranks: &[Rank], buf: &mut [u8], slice_size: usize) -> Result<()> {
        self.rt
            .block_on(self.inner.intra_node_all_gather(ranks, buf, slice_size))
    }

    pub fn close(self) -> Result<()> {
        let Self { inner, rt } = self;
        rt.block_on(inner.close())
    }

    pub fn abort(self) {
        let Self { inner, rt } = self;
        // Dropping sockets and the root task needs the runtime context.
        let _guard = rt.enter();
        inner.abort();
    }

    /// Get a reference to the inner async session.
    pub fn inner(&self) -> &super::Bootstrap {
        &self.inner
    }
}
