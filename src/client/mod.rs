mod async_client;
mod bootstrap;
mod collectives;
mod messaging;
mod sync_client;
mod unexpected;

pub use async_client::Bootstrap;
pub(crate) use async_client::SessionParts;
pub use sync_client::{SyncBootstrap, SyncRendezvous};
