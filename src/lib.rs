pub mod client;
pub mod collective;
pub mod config;
pub mod error;
pub mod protocol;
pub mod rendezvous;
pub mod transport;
pub mod types;

pub use client::{Bootstrap, SyncBootstrap, SyncRendezvous};
pub use config::BootstrapConfig;
pub use error::{BootstrapError, Result};
pub use rendezvous::{Rendezvous, RendezvousHandle, RootService, parse_rendezvous_addr};
pub use transport::{InterfaceSource, NetInterface, raise_fd_limit};
pub use types::{AbortFlag, DEFAULT_MAGIC, MAX_WORLD_SIZE, Rank, Tag};
