pub mod board;
pub mod game;
pub mod role;

pub use board::{compute_winner, Board, Outcome, Symbol, BOARD_SIZE, WINNING_LINES};
pub use game::{GameError, GameState, MatchStatus};
pub use role::Role;
