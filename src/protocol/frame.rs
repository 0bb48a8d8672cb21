//! Length-prefixed framing shared by every bootstrap connection.
//!
//! ```text
//! [0..4] payload_length: u32 LE
//! [4..]  payload
//! ```

use crate::error::{BootstrapError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, data: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(data.len()).map_err(|_| {
        BootstrapError::transport(format!(
            "frame too large: {} bytes exceeds u32::MAX",
            data.len()
        ))
    })?;
    writer
        .write_all(&len.to_le_bytes())
        .await
        .map_err(|e| BootstrapError::transport_with_source("write frame length", e))?;
    writer
        .write_all(data)
        .await
        .map_err(|e| BootstrapError::transport_with_source("write frame payload", e))?;
    writer
        .flush()
        .await
        .map_err(|e| BootstrapError::transport_with_source("flush frame", e))?;
    Ok(())
}

/// Read only the length prefix of the next frame.
pub async fn read_frame_len<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; FRAME_HEADER_SIZE];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| BootstrapError::transport_with_source("read frame length", e))?;
    Ok(u32::from_le_bytes(len_buf) as usize)
}

/// Read one frame into `buf`, returning the payload length.
///
/// A frame longer than `buf` is a hard error: the payload is left unread
/// and `Truncated` is returned rather than a clipped prefix.
pub async fn read_frame_into<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let len = read_frame_len(reader).await?;
    if len > buf.len() {
        return Err(BootstrapError::Truncated {
            received: len,
            capacity: buf.len(),
        });
    }
    reader
        .read_exact(&mut buf[..len])
        .await
        .map_err(|e| BootstrapError::transport_with_source("read frame payload", e))?;
    Ok(len)
}
