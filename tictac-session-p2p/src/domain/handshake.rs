use crate::domain::{Candidate, PeerIdentity, SessionId};
use crate::infrastructure::error::{Result, SessionError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the negotiation produced a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeRole {
    Offer,
    Answer,
}

impl fmt::Display for HandshakeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeRole::Offer => write!(f, "offer"),
            HandshakeRole::Answer => write!(f, "answer"),
        }
    }
}

/// Transport negotiation data carried in a blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NegotiationData {
    pub session_id: SessionId,
    pub peer: PeerIdentity,
    pub candidates: Vec<Candidate>,
}

/// Self-contained negotiation payload exchanged out of band.
///
/// Produced once per role per session and consumed once by the remote party.
/// Wire shape: `{"sdp":{"session_id":..,"peer":..,"candidates":[..]},"type":"offer"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HandshakeBlob {
    sdp: NegotiationData,
    #[serde(rename = "type")]
    role: HandshakeRole,
}

impl HandshakeBlob {
    pub fn offer(session_id: SessionId, peer: PeerIdentity, candidates: Vec<Candidate>) -> Self {
        Self {
            sdp: NegotiationData {
                session_id,
                peer,
                candidates,
            },
            role: HandshakeRole::Offer,
        }
    }

    pub fn answer(session_id: SessionId, peer: PeerIdentity, candidates: Vec<Candidate>) -> Self {
        Self {
            sdp: NegotiationData {
                session_id,
                peer,
                candidates,
            },
            role: HandshakeRole::Answer,
        }
    }

    pub fn role(&self) -> HandshakeRole {
        self.role
    }

    pub fn session_id(&self) -> SessionId {
        self.sdp.session_id
    }

    pub fn peer(&self) -> &PeerIdentity {
        &self.sdp.peer
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.sdp.candidates
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SessionError::InvalidHandshake(format!("malformed blob: {}", e)))
    }

    /// Base64 (standard alphabet) of the JSON form, for text-only transports
    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_json()?))
    }

    pub fn from_base64(text: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| SessionError::InvalidHandshake(format!("not base64: {}", e)))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| SessionError::InvalidHandshake(format!("not utf-8: {}", e)))?;
        Self::from_json(&json)
    }
}
