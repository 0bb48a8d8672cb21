use crate::types::Rank;
use std::net::SocketAddr;

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("root: mismatch in rank count: expected {expected}, registration reported {actual}")]
    RankCountMismatch { expected: u32, actual: u32 },

    #[error("root: rank {rank} of {world_size} has already checked in")]
    DuplicateCheckIn { rank: Rank, world_size: u32 },

    #[error("invalid rank {rank}: world size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("message truncated: received {received} bytes into a {capacity}-byte buffer")]
    Truncated { received: usize, capacity: usize },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("bootstrap transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("connection to {addr} failed: {reason}")]
    ConnectionFailed { addr: SocketAddr, reason: String },

    #[error("record decode failed: {0}")]
    DecodeFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{count} unexpected connection(s) still pending at close")]
    UnexpectedMessagesPending { count: usize },

    #[error(
        "invalid rendezvous address {input:?} ({reason}); use <ipv4>:<port>, [<ipv6>]:<port> or <hostname>:<port>"
    )]
    InvalidAddress { input: String, reason: String },

    #[error("no usable network interface: {0}")]
    NoInterface(String),

    #[error("operation aborted")]
    Aborted,

    #[error("root service failed: {reason}")]
    RootService { reason: String },
}

impl BootstrapError {
    /// Create a `Transport` error with just a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `Transport` error with a message and a source error.
    pub fn transport_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for errors raised by the root while validating registrations.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::RankCountMismatch { .. } | Self::DuplicateCheckIn { .. } | Self::InvalidRank { .. }
        )
    }
}
