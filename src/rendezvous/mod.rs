//! Session setup: the rendezvous handle, the transient root service and
//! ring establishment.

mod handle;
pub(crate) mod ring;
mod root;

pub use handle::{HANDLE_SIZE, RendezvousHandle, parse_rendezvous_addr};
pub use root::RootService;

use crate::client::{Bootstrap, SessionParts};
use crate::collective::allgather::ring_allgather_addrs;
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::transport::{BootstrapListener, NetInterface};
use crate::types::{AbortFlag, DEFAULT_MAGIC, MAX_WORLD_SIZE, Rank};
use ring::RingPlan;

/// A bootstrap session that has not been joined yet.
///
/// Obtained on the process that generates the handle with
/// [`Rendezvous::create`], on every other process with
/// [`Rendezvous::from_handle`], or on all processes alike from an explicit
/// `host:port` with [`Rendezvous::from_comm_id`]. The process that hosts
/// the [`RootService`] keeps ownership of it until the session closes.
pub struct Rendezvous {
    config: BootstrapConfig,
    handle: RendezvousHandle,
    iface: NetInterface,
    abort: AbortFlag,
    root: Option<RootService>,
}

impl Rendezvous {
    /// Generate a fresh handle and start the root service behind it.
    pub async fn create(config: BootstrapConfig) -> Result<Self> {
        let iface = NetInterface::resolve(&config, None).await?;
        let magic = rand::random::<u64>();
        let listener = BootstrapListener::bind(iface.addr, magic, AbortFlag::new()).await?;
        let handle = RendezvousHandle::new(magic, listener.local_addr());
        let root = RootService::spawn(listener, &config);
        tracing::info!(
            session = %handle.session_id(),
            "bootstrap: root listening on {}",
            handle.addr
        );
        Ok(Self {
            config,
            handle,
            iface,
            abort: AbortFlag::new(),
            root: Some(root),
        })
    }

    /// Join a session whose handle was distributed out of band.
    pub async fn from_handle(config: BootstrapConfig, handle: RendezvousHandle) -> Result<Self> {
        let iface = NetInterface::resolve(&config, Some(handle.addr)).await?;
        Ok(Self {
            config,
            handle,
            iface,
            abort: AbortFlag::new(),
            root: None,
        })
    }

    /// Derive the session from an explicit `host:port`.
    ///
    /// Every process derives the same handle with [`DEFAULT_MAGIC`]; rank 0
    /// binds the address and hosts the root service there.
    pub async fn from_comm_id(config: BootstrapConfig, comm_id: &str, rank: Rank) -> Result<Self> {
        let addr = parse_rendezvous_addr(comm_id).await?;
        let handle = RendezvousHandle::new(DEFAULT_MAGIC, addr);
        let iface = NetInterface::resolve(&config, Some(addr)).await?;
        let root = if rank == 0 {
            let listener = BootstrapListener::bind_addr(addr, DEFAULT_MAGIC, AbortFlag::new()).await?;
            tracing::info!(
                session = %handle.session_id(),
                "bootstrap: root listening on {addr}"
            );
            Some(RootService::spawn(listener, &config))
        } else {
            None
        };
        Ok(Self {
            config,
            handle,
            iface,
            abort: AbortFlag::new(),
            root,
        })
    }

    /// [`Rendezvous::from_comm_id`] with the address taken from `config.comm_id`.
    pub async fn from_config(config: BootstrapConfig, rank: Rank) -> Result<Self> {
        let comm_id = config
            .comm_id
            .clone()
            .ok_or_else(|| BootstrapError::InvalidAddress {
                input: String::new(),
                reason: "NEXAR_COMM_ID is not set".into(),
            })?;
        Self::from_comm_id(config, &comm_id, rank).await
    }

    /// Use an externally owned abort flag for every connection of the session.
    pub fn with_abort_flag(mut self, abort: AbortFlag) -> Self {
        self.abort = abort;
        self
    }

    pub fn handle(&self) -> RendezvousHandle {
        self.handle
    }

    pub fn interface(&self) -> NetInterface {
        self.iface
    }

    /// Address of the root service when this process hosts it.
    pub fn root_addr(&self) -> Option<std::net::SocketAddr> {
        self.root.as_ref().map(RootService::local_addr)
    }

    /// Register as `rank` of `world_size`, form the ring and exchange every
    /// rank's public listen address.
    pub async fn join(self, rank: Rank, world_size: u32) -> Result<Bootstrap> {
        if rank >= world_size || world_size > MAX_WORLD_SIZE {
            return Err(BootstrapError::InvalidRank { rank, world_size });
        }
        let Self {
            config,
            handle,
            iface,
            abort,
            root,
        } = self;

        let (listener, mut ring) = ring::establish(RingPlan {
            config: &config,
            handle,
            iface,
            abort: &abort,
            rank,
            world_size,
        })
        .await?;

        let listen_addr = listener.local_addr();
        let peer_addrs = ring_allgather_addrs(&mut ring, rank, world_size, listen_addr).await?;
        tracing::info!(
            session = %handle.session_id(),
            rank,
            world_size,
            "bootstrap: ring established"
        );

        Ok(Bootstrap::new(SessionParts {
            rank,
            world_size,
            handle,
            config,
            abort,
            listener,
            ring,
            peer_addrs,
            root,
        }))
    }
}
