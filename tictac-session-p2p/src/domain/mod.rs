mod candidate;
mod connection_state;
mod handshake;
mod peer;
mod session;

pub use candidate::{Candidate, CandidateKind};
pub use connection_state::{ConnectionState, FailureReason};
pub use handshake::{HandshakeBlob, HandshakeRole, NegotiationData};
pub use peer::PeerIdentity;
pub use session::SessionId;
