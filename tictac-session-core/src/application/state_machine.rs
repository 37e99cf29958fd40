use crate::application::{GameCommand, GameEvent};
use crate::domain::GameState;

/// Command-driven wrapper around one game replica.
///
/// Each peer owns one of these. Feeding both the same ordered commands
/// yields identical states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStateMachine {
    state: GameState,
}

impl GameStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a single command and return the resulting event
    pub fn handle_command(&mut self, command: GameCommand) -> GameEvent {
        match command {
            GameCommand::Move { position, symbol } => {
                match self.state.apply_move(position, symbol) {
                    Ok(next) => {
                        self.state = next;
                        tracing::debug!(position, %symbol, "Move applied");
                        GameEvent::MoveApplied {
                            position,
                            symbol,
                            outcome: next.winner(),
                        }
                    }
                    Err(reason) => {
                        tracing::debug!(position, %symbol, %reason, "Move rejected");
                        GameEvent::CommandFailed {
                            command: command.name(),
                            reason,
                        }
                    }
                }
            }
            GameCommand::Restart => {
                self.state = self.state.apply_restart();
                tracing::debug!("Board restarted");
                GameEvent::Restarted
            }
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Replace the replica wholesale (used to undo an optimistic move)
    pub fn restore(&mut self, state: GameState) {
        self.state = state;
    }
}
