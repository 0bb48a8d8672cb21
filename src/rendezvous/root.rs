use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::protocol::codec::encode_addr;
use crate::protocol::message::{REGISTRATION_SIZE, Registration};
use crate::transport::limits::try_raise_fd_limit;
use crate::transport::{BootstrapListener, BootstrapStream, ConnectPolicy};
use crate::types::{AbortFlag, MAX_WORLD_SIZE, Rank};
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// The transient coordinator of one bootstrap session.
///
/// Collects one `Registration` per rank on the rendezvous address, then
/// tells every rank `r` the public listen address of rank `(r + 1) % N`,
/// which closes the ring regardless of registration order. The task ends
/// after the fan-out; its outcome is only observed through `join`.
pub struct RootService {
    local_addr: SocketAddr,
    task: Option<JoinHandle<Result<()>>>,
}

impl RootService {
    /// Start serving registrations on `listener` in a background task.
    pub fn spawn(listener: BootstrapListener, config: &BootstrapConfig) -> Self {
        let local_addr = listener.local_addr();
        let policy = ConnectPolicy::from(config);
        let raise_fd_limit = config.raise_fd_limit;
        let task = tokio::spawn(async move {
            if raise_fd_limit {
                try_raise_fd_limit();
            }
            let result = serve(listener, policy).await;
            if let Err(ref e) = result {
                tracing::error!("bootstrap root: session failed: {e}");
            }
            result
        });
        Self {
            local_addr,
            task: Some(task),
        }
    }

    /// The rendezvous address this root accepts registrations on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// True once the fan-out has finished (or the session failed).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the root to finish and surface its result.
    pub async fn join(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(BootstrapError::RootService {
                reason: "task was cancelled".into(),
            }),
            Err(e) => Err(BootstrapError::RootService {
                reason: format!("task panicked: {e}"),
            }),
        }
    }

    /// Stop the root without waiting for it.
    pub(crate) fn abort(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RootService {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                tracing::warn!(
                    addr = %self.local_addr,
                    "bootstrap root dropped before finishing, aborting it"
                );
                task.abort();
            }
        }
    }
}

/// Registrations collected so far, indexed by rank.
#[derive(Debug, Default)]
struct RegistrationTable {
    world_size: Option<u32>,
    root_addrs: Vec<Option<SocketAddr>>,
    peer_addrs: Vec<Option<SocketAddr>>,
    collected: u32,
}

impl RegistrationTable {
    /// Record one check-in. The first registration fixes the world size.
    fn insert(&mut self, reg: &Registration) -> Result<()> {
        let world = match self.world_size {
            Some(n) => n,
            None => {
                if reg.world_size > MAX_WORLD_SIZE {
                    return Err(BootstrapError::InvalidRank {
                        rank: reg.rank,
                        world_size: reg.world_size,
                    });
                }
                self.world_size = Some(reg.world_size);
                self.root_addrs = vec![None; reg.world_size as usize];
                self.peer_addrs = vec![None; reg.world_size as usize];
                reg.world_size
            }
        };
        if reg.world_size != world {
            return Err(BootstrapError::RankCountMismatch {
                expected: world,
                actual: reg.world_size,
            });
        }
        if reg.rank >= world {
            return Err(BootstrapError::InvalidRank {
                rank: reg.rank,
                world_size: world,
            });
        }
        let slot = reg.rank as usize;
        if self.root_addrs[slot].is_some() {
            return Err(BootstrapError::DuplicateCheckIn {
                rank: reg.rank,
                world_size: world,
            });
        }
        self.root_addrs[slot] = Some(reg.root_listen_addr);
        self.peer_addrs[slot] = Some(reg.peer_listen_addr);
        self.collected += 1;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.world_size.is_some_and(|n| self.collected == n)
    }

    /// `(rank, root listen addr of rank, public addr of its successor)`.
    fn successor_assignments(&self) -> Result<Vec<(Rank, SocketAddr, SocketAddr)>> {
        let n = self.root_addrs.len();
        (0..n)
            .map(|r| {
                let root_addr = self.root_addrs[r];
                let next_addr = self.peer_addrs[(r + 1) % n];
                match (root_addr, next_addr) {
                    (Some(root_addr), Some(next_addr)) => Ok((r as Rank, root_addr, next_addr)),
                    _ => Err(BootstrapError::RootService {
                        reason: format!("fan-out started with rank {r} or its successor missing"),
                    }),
                }
            })
            .collect()
    }
}

async fn serve(listener: BootstrapListener, policy: ConnectPolicy) -> Result<()> {
    let mut table = RegistrationTable::default();
    tracing::trace!(addr = %listener.local_addr(), "bootstrap root: begin");

    while !table.is_complete() {
        let mut conn = listener.accept().await?;
        let record = conn.recv_record::<REGISTRATION_SIZE>().await?;
        conn.close().await?;

        let reg = Registration::decode(&record)?;
        table.insert(&reg)?;
        tracing::trace!(
            "bootstrap root: received connect from rank {} total {}/{}",
            reg.rank,
            table.collected,
            reg.world_size
        );
    }
    tracing::debug!(
        "bootstrap root: collected all {} registrations",
        table.collected
    );

    // Root connections are never aborted from the outside; `abort` cancels the task.
    let abort = AbortFlag::new();
    let magic = listener.magic();
    for (rank, root_addr, next_addr) in table.successor_assignments()? {
        let mut conn = BootstrapStream::connect(root_addr, magic, policy, &abort).await?;
        conn.send_frame(&encode_addr(&next_addr)).await?;
        conn.close().await?;
        tracing::trace!("bootstrap root: rank {rank} -> successor {next_addr}");
    }
    tracing::debug!(
        "bootstrap root: sent out all {} successor assignments",
        table.collected
    );
    Ok(())
}
