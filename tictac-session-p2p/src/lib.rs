// Domain layer (core)
pub mod domain;

// Application layer (use cases)
pub mod application;

// Infrastructure layer (adapters)
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    ChannelEvent, ConnectionEvent, ConnectionManager, EventQueue, GameProtocol, PendingMove,
    QueueError, SessionChannel, SessionConfig, SessionEvent, SessionFsm, SessionPhase, UserAction,
};
pub use domain::{
    Candidate, CandidateKind, ConnectionState, FailureReason, HandshakeBlob, HandshakeRole,
    NegotiationData, PeerIdentity, SessionId,
};
pub use infrastructure::error::{ProtocolError, Result, SessionError};
pub use infrastructure::message::ProtocolMessage;
pub use infrastructure::signaling::{
    DirectorySignaling, ManualSignaling, MemoryBroker, SignalingChannel, SignalingToken,
};
