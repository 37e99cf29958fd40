use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of cells on the board
pub const BOARD_SIZE: usize = 9;

/// The eight winning triples: 3 rows, 3 columns, 2 diagonals
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Mark placed on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// The symbol that moves after this one
    pub fn opponent(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::X => write!(f, "X"),
            Symbol::O => write!(f, "O"),
        }
    }
}

/// Result of evaluating a board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Game still open
    #[default]
    None,
    /// A winning triple was completed
    Won(Symbol),
    /// Board full, no triple
    Draw,
}

impl Outcome {
    /// Whether the game has reached a terminal outcome
    pub fn is_decided(&self) -> bool {
        !matches!(self, Outcome::None)
    }

    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Outcome::Won(symbol) => Some(*symbol),
            _ => None,
        }
    }
}

/// 3x3 board, cells indexed row-major from 0 to 8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Board {
    cells: [Option<Symbol>; BOARD_SIZE],
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from raw cells
    pub fn from_cells(cells: [Option<Symbol>; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    /// Get the mark at `position` (None if empty or out of range)
    pub fn cell(&self, position: usize) -> Option<Symbol> {
        self.cells.get(position).copied().flatten()
    }

    pub fn cells(&self) -> &[Option<Symbol>; BOARD_SIZE] {
        &self.cells
    }

    pub fn is_occupied(&self, position: usize) -> bool {
        self.cell(position).is_some()
    }

    /// Number of non-empty cells
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.filled_count() == BOARD_SIZE
    }

    /// Write a mark. Callers check range and occupancy first.
    pub(crate) fn place(&mut self, position: usize, symbol: Symbol) {
        self.cells[position] = Some(symbol);
    }

    /// Evaluate the board
    pub fn outcome(&self) -> Outcome {
        compute_winner(self)
    }
}

/// Check the eight winning triples, then fullness.
///
/// Under the alternating-turn invariant at most one triple can be completed
/// by a single move, so the first match is the answer.
pub fn compute_winner(board: &Board) -> Outcome {
    for [a, b, c] in WINNING_LINES {
        if let Some(symbol) = board.cell(a) {
            if board.cell(b) == Some(symbol) && board.cell(c) == Some(symbol) {
                return Outcome::Won(symbol);
            }
        }
    }

    if board.is_full() {
        Outcome::Draw
    } else {
        Outcome::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(marks: &[(usize, Symbol)]) -> Board {
        let mut board = Board::new();
        for (position, symbol) in marks {
            board.place(*position, *symbol);
        }
        board
    }

    #[test]
    fn test_every_winning_line_detected_for_both_symbols() {
        for symbol in [Symbol::X, Symbol::O] {
            for line in WINNING_LINES {
                let marks: Vec<_> = line.iter().map(|&p| (p, symbol)).collect();
                let board = board_with(&marks);
                assert_eq!(
                    compute_winner(&board),
                    Outcome::Won(symbol),
                    "line {:?} for {}",
                    line,
                    symbol
                );
            }
        }
    }

    #[test]
    fn test_full_board_without_line_is_draw() {
        // X O X
        // X O O
        // O X X
        use Symbol::{O, X};
        let board = Board::from_cells([
            Some(X),
            Some(O),
            Some(X),
            Some(X),
            Some(O),
            Some(O),
            Some(O),
            Some(X),
            Some(X),
        ]);

        assert!(board.is_full());
        assert_eq!(compute_winner(&board), Outcome::Draw);
    }

    #[test]
    fn test_fewer_than_five_marks_is_open() {
        let board = board_with(&[
            (0, Symbol::X),
            (4, Symbol::O),
            (1, Symbol::X),
            (2, Symbol::O),
        ]);

        assert_eq!(board.filled_count(), 4);
        assert_eq!(compute_winner(&board), Outcome::None);
        assert_eq!(compute_winner(&Board::new()), Outcome::None);
    }

    #[test]
    fn test_mixed_line_is_not_a_win() {
        let board = board_with(&[(0, Symbol::X), (1, Symbol::O), (2, Symbol::X)]);
        assert_eq!(compute_winner(&board), Outcome::None);
    }

    #[test]
    fn test_cell_out_of_range_is_empty() {
        let board = Board::new();
        assert_eq!(board.cell(9), None);
        assert!(!board.is_occupied(42));
    }

    #[test]
    fn test_symbol_opponent() {
        assert_eq!(Symbol::X.opponent(), Symbol::O);
        assert_eq!(Symbol::O.opponent(), Symbol::X);
    }

    #[test]
    fn test_outcome_defaults_to_undecided() {
        assert_eq!(Outcome::default(), Outcome::None);
        assert!(!Outcome::default().is_decided());
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(serde_json::to_string(&Outcome::None).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&Outcome::Draw).unwrap(), "\"draw\"");
        assert_eq!(
            serde_json::to_string(&Outcome::Won(Symbol::X)).unwrap(),
            "{\"won\":\"X\"}"
        );
    }
}
