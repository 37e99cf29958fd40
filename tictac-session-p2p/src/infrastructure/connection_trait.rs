use crate::infrastructure::error::Result;

/// Events surfaced by a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// One complete frame body
    Received(Vec<u8>),
    /// Link is gone, no more frames will arrive
    Closed { reason: String },
}

/// Trait for a negotiated point-to-point link (allows mocking in tests)
pub trait Link: Send {
    /// Queue one frame for delivery. Never waits for the peer.
    fn send(&mut self, frame: Vec<u8>) -> Result<()>;

    /// Drain everything that arrived since the last call, in order
    fn poll_events(&mut self) -> Vec<LinkEvent>;

    fn is_open(&self) -> bool;

    fn close(&mut self);
}
