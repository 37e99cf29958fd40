use std::fmt;

/// Lifecycle of one peer link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    /// Listener bound or offer applied, gathering local candidates
    NegotiatingLocal,
    /// Offer published, waiting for the joiner's answer
    AwaitingRemote,
    /// Both blobs exchanged, TCP dial and hello in flight
    Connecting,
    Open,
    Closing,
    Closed,
    Failed,
}

impl ConnectionState {
    /// No further transitions except a fresh session
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    /// States bounded by a deadline
    pub fn is_waiting(self) -> bool {
        matches!(
            self,
            ConnectionState::AwaitingRemote | ConnectionState::Connecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::NegotiatingLocal => "negotiating",
            ConnectionState::AwaitingRemote => "awaiting remote",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Classification of a link failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Remote never answered, every candidate failed, or discovery never settled
    Unreachable,
    /// Remote declined the hello, or sent one we could not accept
    Rejected,
    /// Link dropped after it was open
    LinkLost,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Unreachable => write!(f, "unreachable"),
            FailureReason::Rejected => write!(f, "rejected"),
            FailureReason::LinkLost => write!(f, "link lost"),
        }
    }
}
