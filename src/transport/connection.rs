use crate::config::BootstrapConfig;
use crate::error::{BootstrapError, Result};
use crate::protocol::frame::{read_frame_into, write_frame};
use crate::types::AbortFlag;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Size of the session magic preamble written by the connecting side.
pub const MAGIC_SIZE: usize = 8;

/// How hard `BootstrapStream::connect` tries before giving up.
#[derive(Debug, Clone, Copy)]
pub struct ConnectPolicy {
    pub retries: u32,
    pub interval: Duration,
}

impl From<&BootstrapConfig> for ConnectPolicy {
    fn from(cfg: &BootstrapConfig) -> Self {
        Self {
            retries: cfg.connect_retries,
            interval: cfg.connect_retry_interval,
        }
    }
}

/// One bootstrap TCP connection carrying length-prefixed frames.
pub struct BootstrapStream {
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl BootstrapStream {
    /// Connect to `addr` and announce `magic`.
    ///
    /// Refused, reset and timed-out connects are retried per `policy`
    /// (the remote listener may not be bound yet). The abort flag is
    /// checked before every attempt.
    pub async fn connect(
        addr: SocketAddr,
        magic: u64,
        policy: ConnectPolicy,
        abort: &AbortFlag,
    ) -> Result<Self> {
        let mut attempt = 0u32;
        let stream = loop {
            if abort.is_set() {
                return Err(BootstrapError::Aborted);
            }
            let result = tokio::select! {
                r = TcpStream::connect(addr) => r,
                _ = abort.cancelled() => return Err(BootstrapError::Aborted),
            };
            match result {
                Ok(stream) => break stream,
                Err(e) if is_retryable(e.kind()) && attempt < policy.retries => {
                    attempt += 1;
                    tracing::trace!(%addr, attempt, "connect failed ({e}), retrying");
                    tokio::time::sleep(policy.interval).await;
                }
                Err(e) => {
                    return Err(BootstrapError::ConnectionFailed {
                        addr,
                        reason: format!("{e} (after {attempt} retries)"),
                    });
                }
            }
        };
        stream
            .set_nodelay(true)
            .map_err(|e| BootstrapError::transport_with_source("set_nodelay", e))?;

        let mut conn = Self {
            stream,
            peer_addr: addr,
        };
        conn.stream
            .write_all(&magic.to_le_bytes())
            .await
            .map_err(|e| BootstrapError::ConnectionFailed {
                addr,
                reason: format!("write magic: {e}"),
            })?;
        Ok(conn)
    }

    pub(crate) fn from_accepted(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self { stream, peer_addr }
    }

    /// Remote address of this connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub async fn send_frame(&mut self, data: &[u8]) -> Result<()> {
        write_frame(&mut self.stream, data).await
    }

    /// Receive one frame into `buf`; see [`read_frame_into`].
    pub async fn recv_frame_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        read_frame_into(&mut self.stream, buf).await
    }

    /// Receive one frame that must be exactly `N` bytes long.
    pub async fn recv_record<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        let n = self.recv_frame_into(&mut buf).await?;
        if n != N {
            return Err(BootstrapError::DecodeFailed(format!(
                "record from {} is {n} bytes, expected {N}",
                self.peer_addr
            )));
        }
        Ok(buf)
    }

    /// Shut down the write half and release the socket.
    pub async fn close(mut self) -> Result<()> {
        match self.stream.shutdown().await {
            Ok(()) => Ok(()),
            // The peer may already have hung up after reading everything.
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(BootstrapError::transport_with_source(
                format!("close connection to {}", self.peer_addr),
                e,
            )),
        }
    }
}

fn is_retryable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::TimedOut
    )
}
