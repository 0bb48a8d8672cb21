//! Point-to-point messaging addressed by `(peer, tag)`.

use crate::error::Result;
use crate::protocol::message::{PEER_HEADER_SIZE, PeerHeader};
use crate::transport::BootstrapStream;
use crate::types::{Rank, Tag};

use super::Bootstrap;

impl Bootstrap {
    /// Send `data` to `peer` under `tag`.
    ///
    /// Every message travels on its own connection to the peer's public
    /// listener: a header frame `(sender, tag)` followed by the payload
    /// frame. Completes once the payload is handed to the kernel; it does
    /// not wait for the matching `recv`.
    pub async fn send(&self, peer: Rank, tag: Tag, data: &[u8]) -> Result<()> {
        let addr = self.peer_addr(peer)?;
        let mut conn = BootstrapStream::connect(addr, self.handle.magic, self.policy, &self.abort).await?;
        let header = PeerHeader {
            sender: self.rank,
            tag,
        };
        conn.send_frame(&header.encode()).await?;
        conn.send_frame(data).await?;
        conn.close().await
    }

    /// Receive the message `peer` sent under `tag` into `buf`, returning
    /// its length.
    ///
    /// Messages for other `(peer, tag)` pairs that arrive first are parked
    /// with their connection still open and handed out by later calls. A
    /// payload longer than `buf` fails with `Truncated`.
    pub async fn recv(&self, peer: Rank, tag: Tag, buf: &mut [u8]) -> Result<usize> {
        self.peer_addr(peer)?;
        let mut inbox = self.inbox.lock().await;

        if let Some(conn) = inbox.unexpected.take(peer, tag) {
            tracing::trace!(rank = self.rank, peer, tag, "bootstrap: matched queued message");
            return read_payload(conn, buf).await;
        }

        loop {
            let mut conn = inbox.listener.accept().await?;
            let header = PeerHeader::decode(&conn.recv_record::<PEER_HEADER_SIZE>().await?);
            if header.matches(peer, tag) {
                return read_payload(conn, buf).await;
            }
            tracing::trace!(
                rank = self.rank,
                sender = header.sender,
                tag = header.tag,
                waiting_for_peer = peer,
                waiting_for_tag = tag,
                "bootstrap: queued unexpected message"
            );
            inbox.unexpected.push(header.sender, header.tag, conn);
        }
    }
}

async fn read_payload(mut conn: BootstrapStream, buf: &mut [u8]) -> Result<usize> {
    let n = conn.recv_frame_into(buf).await?;
    conn.close().await?;
    Ok(n)
}
