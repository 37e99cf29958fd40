use crate::domain::{GameError, Outcome, Symbol};

/// Events emitted by the state machine after a command was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A mark was placed
    MoveApplied {
        position: usize,
        symbol: Symbol,
        outcome: Outcome,
    },

    /// Board was reset
    Restarted,

    /// Command was rejected, replica unchanged
    CommandFailed {
        command: &'static str,
        reason: GameError,
    },
}

impl GameEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, GameEvent::CommandFailed { .. })
    }
}
