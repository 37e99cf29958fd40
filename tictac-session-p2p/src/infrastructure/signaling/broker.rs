use crate::domain::HandshakeBlob;
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::signaling::{
    answer_key, storage_key, SignalingChannel, SignalingToken,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// In-process rendezvous broker. Clones share one store.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
    retrieve_timeout: Duration,
}

#[derive(Debug, Default)]
struct BrokerInner {
    blobs: Mutex<HashMap<String, HandshakeBlob>>,
    published: Notify,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BrokerInner::default()),
            retrieve_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_retrieve_timeout(mut self, timeout: Duration) -> Self {
        self.retrieve_timeout = timeout;
        self
    }

    /// Number of blobs published but not yet retrieved
    pub fn pending(&self) -> usize {
        self.inner.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    fn take(&self, key: &str) -> Result<Option<HandshakeBlob>> {
        let mut blobs = self
            .inner
            .blobs
            .lock()
            .map_err(|_| SessionError::Signaling("broker store poisoned".to_string()))?;
        Ok(blobs.remove(key))
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingChannel for MemoryBroker {
    async fn publish(&self, blob: &HandshakeBlob) -> Result<SignalingToken> {
        let key = storage_key(blob);
        {
            let mut blobs = self
                .inner
                .blobs
                .lock()
                .map_err(|_| SessionError::Signaling("broker store poisoned".to_string()))?;
            blobs.insert(key.clone(), blob.clone());
        }
        self.inner.published.notify_waiters();

        tracing::debug!("📤 Broker holds {}", key);
        Ok(SignalingToken::new(key))
    }

    async fn retrieve(&self, token: &SignalingToken) -> Result<HandshakeBlob> {
        let deadline = tokio::time::Instant::now() + self.retrieve_timeout;

        loop {
            // Register interest before checking so a publish in between is not missed
            let published = self.inner.published.notified();
            tokio::pin!(published);
            published.as_mut().enable();

            if let Some(blob) = self.take(token.as_str())? {
                tracing::debug!("📥 Broker handed out {}", token);
                return Ok(blob);
            }

            if tokio::time::timeout_at(deadline, published).await.is_err() {
                return Err(SessionError::Signaling(format!(
                    "timed out waiting for {}",
                    token
                )));
            }
        }
    }

    fn answer_token(&self, offer_token: &SignalingToken) -> Option<SignalingToken> {
        answer_key(offer_token)
    }
}
