//! Length-prefixed JSON framing.
//!
//! Every message on the wire is:
//!
//!   `<4 ASCII decimal digits><UTF-8 JSON payload>`
//!
//! where the digits give the payload length in bytes (`0000`..=`9999`), so a
//! single payload can never exceed [`MAX_PAYLOAD`] bytes. A connection carries
//! one request and its response at a time; there is no pipelining.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const HEADER_LEN: usize = 4;
pub const MAX_PAYLOAD: usize = 9999;

#[derive(Debug, Error)]
pub enum FramingError {
    /// Peer closed the stream partway through a header or payload.
    #[error("stream closed mid-frame ({read} of {expected} bytes)")]
    Truncated { read: usize, expected: usize },

    #[error("invalid length header {0:?}")]
    BadHeader(String),

    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD} byte frame limit")]
    Oversize(usize),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize `msg` and prepend its length header.
pub fn encode<T: Serialize + ?Sized>(msg: &T) -> Result<Vec<u8>, FramingError> {
    let payload = serde_json::to_vec(msg)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(FramingError::Oversize(payload.len()));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(format!("{:04}", payload.len()).as_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn parse_header(header: &[u8]) -> Result<usize, FramingError> {
    if header.len() != HEADER_LEN || !header.iter().all(u8::is_ascii_digit) {
        return Err(FramingError::BadHeader(String::from_utf8_lossy(header).into_owned()));
    }
    Ok(header
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0')))
}

/// Read one raw payload. `Ok(None)` means the peer closed cleanly between
/// frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FramingError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FramingError::Truncated {
                read: filled,
                expected: HEADER_LEN,
            });
        }
        filled += n;
    }

    let len = parse_header(&header)?;
    let mut payload = vec![0u8; len];
    let mut read = 0;
    while read < len {
        let n = reader.read(&mut payload[read..]).await?;
        if n == 0 {
            return Err(FramingError::Truncated { read, expected: len });
        }
        read += n;
    }
    Ok(Some(payload))
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, FramingError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Read and deserialize one message; `Ok(None)` on clean end-of-stream.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, FramingError>
where
    R: AsyncRead + Unpin + ?Sized,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(payload) => decode(&payload).map(Some),
        None => Ok(None),
    }
}

/// Encode `msg` and write header and payload as one buffer.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin + ?Sized,
    T: Serialize + ?Sized,
{
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
