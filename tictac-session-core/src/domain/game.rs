use crate::domain::{Board, Outcome, Symbol, BOARD_SIZE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors raised when a transition would break a board invariant
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Position {0} is out of range (expected 0-8)")]
    OutOfRange(usize),

    #[error("Cell {0} is already occupied")]
    CellOccupied(usize),

    #[error("Game is already over")]
    GameOver,

    #[error("It is {expected}'s turn, not {actual}'s")]
    OutOfTurn { expected: Symbol, actual: Symbol },
}

/// Lifecycle of one match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    InProgress,
    Won(Symbol),
    Drawn,
}

/// One replica of the game: board, whose turn it is, and the outcome.
///
/// Transitions are pure: they return a new state and leave `self` untouched,
/// so a rejected move can never leave a half-applied replica behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GameState {
    board: Board,
    turn_owner: Symbol,
    winner: Outcome,
}

impl GameState {
    /// Initial state: empty board, X to move
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            turn_owner: Symbol::X,
            winner: Outcome::None,
        }
    }

    // ===== Getters =====

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn_owner(&self) -> Symbol {
        self.turn_owner
    }

    pub fn winner(&self) -> Outcome {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_decided()
    }

    pub fn status(&self) -> MatchStatus {
        match self.winner {
            Outcome::None => MatchStatus::InProgress,
            Outcome::Won(symbol) => MatchStatus::Won(symbol),
            Outcome::Draw => MatchStatus::Drawn,
        }
    }

    // ===== Transitions =====

    /// Place `symbol` at `position`, flip the turn and recompute the winner
    pub fn apply_move(&self, position: usize, symbol: Symbol) -> Result<GameState, GameError> {
        if position >= BOARD_SIZE {
            return Err(GameError::OutOfRange(position));
        }

        if self.is_over() {
            return Err(GameError::GameOver);
        }

        if symbol != self.turn_owner {
            return Err(GameError::OutOfTurn {
                expected: self.turn_owner,
                actual: symbol,
            });
        }

        if self.board.is_occupied(position) {
            return Err(GameError::CellOccupied(position));
        }

        let mut board = self.board;
        board.place(position, symbol);

        Ok(GameState {
            board,
            turn_owner: symbol.opponent(),
            winner: board.outcome(),
        })
    }

    /// Back to the initial state, whatever came before
    pub fn apply_restart(&self) -> GameState {
        GameState::new()
    }

    /// Human readable status, e.g. "Next player: X"
    pub fn status_line(&self) -> String {
        match self.winner {
            Outcome::Won(symbol) => format!("Winner: {}", symbol),
            Outcome::Draw => "It's a draw!".to_string(),
            Outcome::None => format!("Next player: {}", self.turn_owner),
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(state: GameState, moves: &[usize]) -> GameState {
        moves.iter().fold(state, |state, &position| {
            let symbol = state.turn_owner();
            state.apply_move(position, symbol).unwrap()
        })
    }

    #[test]
    fn test_new_game() {
        let state = GameState::new();
        assert_eq!(state.turn_owner(), Symbol::X);
        assert_eq!(state.winner(), Outcome::None);
        assert_eq!(state.board().filled_count(), 0);
        assert_eq!(state.status(), MatchStatus::InProgress);
    }

    #[test]
    fn test_apply_move_flips_turn() {
        let state = GameState::new().apply_move(4, Symbol::X).unwrap();

        assert_eq!(state.board().cell(4), Some(Symbol::X));
        assert_eq!(state.turn_owner(), Symbol::O);
    }

    #[test]
    fn test_occupied_cell_rejected_without_mutation() {
        let state = play(GameState::new(), &[4]);
        let before = state;

        let result = state.apply_move(4, Symbol::O);

        assert_eq!(result, Err(GameError::CellOccupied(4)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let state = GameState::new();
        let result = state.apply_move(0, Symbol::O);

        assert_eq!(
            result,
            Err(GameError::OutOfTurn {
                expected: Symbol::X,
                actual: Symbol::O
            })
        );
    }

    #[test]
    fn test_out_of_range_rejected() {
        let result = GameState::new().apply_move(9, Symbol::X);
        assert_eq!(result, Err(GameError::OutOfRange(9)));
    }

    #[test]
    fn test_win_is_terminal() {
        // X: 0, 4, 8 / O: 1, 2
        let state = play(GameState::new(), &[0, 1, 4, 2, 8]);

        assert_eq!(state.winner(), Outcome::Won(Symbol::X));
        assert_eq!(state.status(), MatchStatus::Won(Symbol::X));
        assert_eq!(state.apply_move(3, Symbol::O), Err(GameError::GameOver));
    }

    #[test]
    fn test_draw() {
        let state = play(GameState::new(), &[0, 1, 2, 4, 3, 5, 7, 6, 8]);

        assert_eq!(state.winner(), Outcome::Draw);
        assert_eq!(state.status(), MatchStatus::Drawn);
        assert_eq!(state.status_line(), "It's a draw!");
    }

    #[test]
    fn test_restart_after_terminal_state() {
        let won = play(GameState::new(), &[0, 1, 4, 2, 8]);
        let restarted = won.apply_restart();

        assert_eq!(restarted, GameState::new());
        assert_eq!(restarted.turn_owner(), Symbol::X);
        assert_eq!(restarted.winner(), Outcome::None);
    }

    #[test]
    fn test_status_line() {
        let state = GameState::new();
        assert_eq!(state.status_line(), "Next player: X");

        let won = play(state, &[0, 1, 4, 2, 8]);
        assert_eq!(won.status_line(), "Winner: X");
    }
}
