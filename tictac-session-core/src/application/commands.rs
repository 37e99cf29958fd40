use crate::domain::Symbol;

/// Commands that can be executed against a game replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    /// Place a mark
    Move { position: usize, symbol: Symbol },

    /// Reset the board, X to move
    Restart,
}

impl GameCommand {
    /// Short name used in failure events and logs
    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::Move { .. } => "Move",
            GameCommand::Restart => "Restart",
        }
    }
}
