use crate::domain::{PeerIdentity, SessionId};
use crate::infrastructure::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default upper bound for one frame body
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Length prefix: 4 bytes, big-endian
const LENGTH_PREFIX_SIZE: usize = 4;

/// The only vocabulary on an open session channel.
///
/// `{"type":"move","position":4}` or `{"type":"restart"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    Move { position: u8 },
    Restart,
}

impl ProtocolMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Fails for unknown kinds and malformed JSON
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Link hello exchanged once, right after TCP connects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlFrame {
    /// Joiner -> host
    Hello {
        session_id: SessionId,
        peer: PeerIdentity,
    },
    /// Host -> joiner, link accepted
    Welcome { peer: PeerIdentity },
    /// Host -> joiner, link declined
    Reject { reason: String },
}

impl ControlFrame {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Write one length-prefixed frame and flush
pub async fn write_frame(writer: &mut (impl AsyncWrite + Unpin), body: &[u8]) -> io::Result<()> {
    let length = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;

    writer.write_all(&length.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

/// Read one length-prefixed frame.
///
/// Returns `Ok(None)` when the stream ends cleanly between frames.
pub async fn read_frame(
    reader: &mut (impl AsyncRead + Unpin),
    max_frame_size: usize,
) -> io::Result<Option<Vec<u8>>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let length = u32::from_be_bytes(prefix) as usize;
    if length > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "frame of {} bytes exceeds limit of {}",
                length, max_frame_size
            ),
        ));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}
