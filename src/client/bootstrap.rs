use crate::client::Bootstrap;
use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::rendezvous::Rendezvous;
use crate::types::AbortFlag;

impl Bootstrap {
    /// Run a whole session over loopback inside this process.
    ///
    /// Rank 0 generates the handle and hosts the root service; every rank
    /// joins from its own tokio task. Returns the sessions sorted by rank.
    /// If any rank fails the shared abort flag is raised so the others stop
    /// waiting on it.
    pub async fn bootstrap_local(world_size: u32) -> Result<Vec<Bootstrap>> {
        if world_size == 0 {
            return Err(BootstrapError::InvalidRank {
                rank: 0,
                world_size,
            });
        }
        let config = BootstrapConfig::local();
        let abort = AbortFlag::new();
        let root = Rendezvous::create(config.clone())
            .await?
            .with_abort_flag(abort.clone());
        let handle = root.handle();

        let mut tasks = Vec::with_capacity(world_size as usize);
        tasks.push(tokio::spawn(root.join(0, world_size)));
        for rank in 1..world_size {
            let config = config.clone();
            let abort = abort.clone();
            tasks.push(tokio::spawn(async move {
                Rendezvous::from_handle(config, handle)
                    .await?
                    .with_abort_flag(abort)
                    .join(rank, world_size)
                    .await
            }));
        }

        let joined = futures::future::try_join_all(tasks.into_iter().map(|task| {
            let abort = abort.clone();
            async move {
                let result = task
                    .await
                    .map_err(|e| BootstrapError::transport_with_source("bootstrap task panicked", e))
                    .and_then(|r| r);
                if result.is_err() {
                    abort.set();
                }
                result
            }
        }))
        .await;

        let mut sessions = joined?;
        sessions.sort_by_key(Bootstrap::rank);
        Ok(sessions)
    }
}
