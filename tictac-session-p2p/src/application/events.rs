use crate::application::SessionChannel;
use crate::domain::{ConnectionState, FailureReason};
use crate::infrastructure::message::ProtocolMessage;

/// Lifecycle events emitted by the connection manager
#[derive(Debug)]
pub enum ConnectionEvent {
    StateChanged(ConnectionState),
    /// Link is open; the channel is handed to its single owner
    ChannelReady(SessionChannel),
    Failed {
        reason: FailureReason,
        detail: String,
    },
}

/// Events emitted by an open session channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Message(ProtocolMessage),
    Closed { reason: String },
}

/// Local input from the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Play(usize),
    Restart,
    Leave,
}

/// Everything the session reacts to, in one queue
#[derive(Debug)]
pub enum SessionEvent {
    Connection(ConnectionEvent),
    Channel(ChannelEvent),
    Local(UserAction),
}
