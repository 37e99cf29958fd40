use crate::application::QueueError;
use crate::domain::FailureReason;
use tictac_session_core::{GameError, Symbol};

/// Violations of the move protocol. Logged and discarded, never fatal.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Position {0} is out of range (expected 0-8)")]
    OutOfRange(usize),

    #[error("Not your turn (waiting for {expected})")]
    NotYourTurn { expected: Symbol },

    #[error("Replica desync: {0}")]
    Desync(String),

    #[error("Illegal move: {0}")]
    IllegalMove(#[from] GameError),
}

/// Session and transport errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    #[error("Link {reason}: {detail}")]
    Link {
        reason: FailureReason,
        detail: String,
    },

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Signaling failed: {0}")]
    Signaling(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not allowed while {0}")]
    InvalidPhase(String),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl SessionError {
    pub fn link(reason: FailureReason, detail: impl Into<String>) -> Self {
        SessionError::Link {
            reason,
            detail: detail.into(),
        }
    }

    /// Failure class if this error is a link failure
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            SessionError::Link { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
