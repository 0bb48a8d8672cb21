mod connection;
pub mod limits;
mod listener;
pub mod netif;

pub use connection::{BootstrapStream, ConnectPolicy, MAGIC_SIZE};
pub use limits::raise_fd_limit;
pub use listener::BootstrapListener;
pub use netif::{InterfaceSource, NetInterface};
