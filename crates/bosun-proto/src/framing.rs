use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ProtoError;

/// Maximum envelope size accepted on either side of a channel.
pub const MAX_FRAME_SIZE: u32 = 8 * 1024 * 1024;

/// Writes one length-prefixed frame carrying a complete envelope.
///
/// The caller must hold the channel's write lock for the whole call so
/// envelopes from concurrent requests never interleave on the wire.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    envelope: &[u8],
) -> Result<(), ProtoError> {
    let size = checked_size(envelope.len())?;
    writer.write_all(&size.to_be_bytes()).await?;
    writer.write_all(envelope).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame from the channel.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtoError> {
    let mut prefix = [0_u8; 4];
    reader.read_exact(&mut prefix).await?;

    let size = u32::from_be_bytes(prefix);
    if size > MAX_FRAME_SIZE {
        return Err(ProtoError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = vec![0_u8; size as usize];
    reader.read_exact(&mut frame).await?;
    Ok(frame)
}

fn checked_size(len: usize) -> Result<u32, ProtoError> {
    let size: u32 = len.try_into().map_err(|_| ProtoError::FrameTooLarge {
        size: u32::MAX,
        max: MAX_FRAME_SIZE,
    })?;

    if size > MAX_FRAME_SIZE {
        return Err(ProtoError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(size)
}
