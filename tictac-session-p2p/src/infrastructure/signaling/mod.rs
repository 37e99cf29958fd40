//! Out-of-band exchange of handshake blobs.
//!
//! The session only needs two things from a signaling transport: put a blob
//! somewhere and get back a token the other party can use, and turn such a
//! token back into a blob. Keyed transports store blobs under
//! `<session_id>.<offer|answer>`.

mod broker;
mod directory;
mod manual;

pub use broker::MemoryBroker;
pub use directory::DirectorySignaling;
pub use manual::ManualSignaling;

use crate::domain::HandshakeBlob;
use crate::infrastructure::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Handle a user (or a program) passes to the remote party
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalingToken(String);

impl SignalingToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SignalingToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for SignalingToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Trait for a signaling transport (allows swapping in tests)
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Make a blob available to the remote party
    async fn publish(&self, blob: &HandshakeBlob) -> Result<SignalingToken>;

    /// Fetch the blob behind a token, waiting for it if the transport can
    async fn retrieve(&self, token: &SignalingToken) -> Result<HandshakeBlob>;

    /// Token under which the answer to `offer_token` will appear, when the
    /// transport can tell in advance
    fn answer_token(&self, _offer_token: &SignalingToken) -> Option<SignalingToken> {
        None
    }
}

/// `<session_id>.<offer|answer>`
pub(crate) fn storage_key(blob: &HandshakeBlob) -> String {
    format!("{}.{}", blob.session_id(), blob.role())
}

pub(crate) fn answer_key(offer_token: &SignalingToken) -> Option<SignalingToken> {
    offer_token
        .as_str()
        .strip_suffix(".offer")
        .map(|session| SignalingToken::new(format!("{}.answer", session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerIdentity, SessionId};

    #[test]
    fn test_storage_key() {
        let session_id = SessionId::new();
        let offer = HandshakeBlob::offer(session_id, PeerIdentity::from("a"), Vec::new());
        let answer = HandshakeBlob::answer(session_id, PeerIdentity::from("b"), Vec::new());

        assert_eq!(storage_key(&offer), format!("{}.offer", session_id));
        assert_eq!(storage_key(&answer), format!("{}.answer", session_id));
    }

    #[test]
    fn test_answer_key() {
        let offer = SignalingToken::new("abc.offer");
        assert_eq!(answer_key(&offer), Some(SignalingToken::new("abc.answer")));
        assert_eq!(answer_key(&SignalingToken::new("abc.answer")), None);
    }

    #[test]
    fn test_token_is_trimmed() {
        assert_eq!(SignalingToken::new("  key.offer\n").as_str(), "key.offer");
    }
}
