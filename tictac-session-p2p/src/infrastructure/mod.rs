pub mod connection_trait;
pub mod error;
pub mod gatherer;
pub mod message;
pub mod signaling;
pub mod tcp_link;

pub use connection_trait::{Link, LinkEvent};
pub use gatherer::CandidateGatherer;
pub use tcp_link::TcpLink;
