use crate::domain::HandshakeBlob;
use crate::infrastructure::error::Result;
use crate::infrastructure::signaling::{SignalingChannel, SignalingToken};
use async_trait::async_trait;

/// Copy/paste signaling: the token is the blob itself, base64 encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualSignaling;

impl ManualSignaling {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignalingChannel for ManualSignaling {
    async fn publish(&self, blob: &HandshakeBlob) -> Result<SignalingToken> {
        Ok(SignalingToken::new(blob.to_base64()?))
    }

    async fn retrieve(&self, token: &SignalingToken) -> Result<HandshakeBlob> {
        HandshakeBlob::from_base64(token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerIdentity, SessionId};
    use crate::infrastructure::error::SessionError;

    #[tokio::test]
    async fn test_token_carries_the_blob() {
        let signaling = ManualSignaling::new();
        let blob = HandshakeBlob::offer(SessionId::new(), PeerIdentity::generate(), Vec::new());

        let token = signaling.publish(&blob).await.unwrap();
        assert_eq!(signaling.retrieve(&token).await.unwrap(), blob);
        assert_eq!(signaling.answer_token(&token), None);
    }

    #[tokio::test]
    async fn test_pasted_garbage() {
        let result = ManualSignaling::new()
            .retrieve(&SignalingToken::new("definitely not a blob"))
            .await;
        assert!(matches!(result, Err(SessionError::InvalidHandshake(_))));
    }
}
