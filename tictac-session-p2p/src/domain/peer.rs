use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque name of one party, fixed for the whole session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Generate a fresh identity from a random UUID v4
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for logs and status lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeerIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PeerIdentity {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identities_differ() {
        assert_ne!(PeerIdentity::generate(), PeerIdentity::generate());
    }

    #[test]
    fn test_short() {
        let peer = PeerIdentity::from("0123456789abcdef");
        assert_eq!(peer.short(), "01234567");

        let tiny = PeerIdentity::from("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_peer_identity_serialization() {
        let peer = PeerIdentity::from("alice");
        let json = serde_json::to_string(&peer).unwrap();
        assert_eq!(json, "\"alice\"");

        let deserialized: PeerIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(peer, deserialized);
    }
}
