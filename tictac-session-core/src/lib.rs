pub mod application;
pub mod domain;

pub use application::{GameCommand, GameEvent, GameStateMachine};
pub use domain::{
    compute_winner, Board, GameError, GameState, MatchStatus, Outcome, Role, Symbol, BOARD_SIZE,
    WINNING_LINES,
};
