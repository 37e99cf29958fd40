use crate::domain::HandshakeBlob;
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::signaling::{
    answer_key, storage_key, SignalingChannel, SignalingToken,
};
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Rendezvous through a directory both parties can see (shared mount, sync folder).
///
/// Blobs are written to `<dir>/<session_id>.<offer|answer>` and the token is the
/// file name. `retrieve` polls until the file shows up.
#[derive(Debug, Clone)]
pub struct DirectorySignaling {
    dir: PathBuf,
    retrieve_timeout: Duration,
    poll_interval: Duration,
}

impl DirectorySignaling {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retrieve_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(200),
        }
    }

    pub fn with_retrieve_timeout(mut self, timeout: Duration) -> Self {
        self.retrieve_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(SessionError::Signaling(format!(
                "invalid signaling key: {:?}",
                key
            )));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl SignalingChannel for DirectorySignaling {
    async fn publish(&self, blob: &HandshakeBlob) -> Result<SignalingToken> {
        let key = storage_key(blob);
        let path = self.path_for(&key)?;
        let staging = self.dir.join(format!(".{}.tmp", key));

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&staging, blob.to_json()?).await?;
        // Rename so readers never see a half-written blob
        tokio::fs::rename(&staging, &path).await?;

        tracing::info!("📤 Published {} to {}", blob.role(), path.display());
        Ok(SignalingToken::new(key))
    }

    async fn retrieve(&self, token: &SignalingToken) -> Result<HandshakeBlob> {
        let path = self.path_for(token.as_str())?;
        let deadline = tokio::time::Instant::now() + self.retrieve_timeout;

        loop {
            match tokio::fs::read_to_string(&path).await {
                Ok(json) => {
                    let blob = HandshakeBlob::from_json(&json)?;
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::debug!("Could not remove {}: {}", path.display(), e);
                    }
                    tracing::info!("📥 Retrieved {} from {}", blob.role(), path.display());
                    return Ok(blob);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(SessionError::Signaling(format!(
                    "timed out waiting for {}",
                    path.display()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn answer_token(&self, offer_token: &SignalingToken) -> Option<SignalingToken> {
        answer_key(offer_token)
    }
}
