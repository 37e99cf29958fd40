use std::fmt;
use tictac_session_core::{GameState, BOARD_SIZE};
use tictac_session_p2p::{SessionFsm, SessionPhase};

/// Text grid of a board. Empty cells show their index so the user knows
/// what to type.
pub struct BoardView<'a> {
    state: &'a GameState,
}

impl<'a> BoardView<'a> {
    pub fn new(state: &'a GameState) -> Self {
        Self { state }
    }

    fn cell(&self, position: usize) -> String {
        match self.state.board().cell(position) {
            Some(symbol) => symbol.to_string(),
            None => position.to_string(),
        }
    }
}

impl fmt::Display for BoardView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..BOARD_SIZE / 3 {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            let base = row * 3;
            writeln!(
                f,
                " {} | {} | {}",
                self.cell(base),
                self.cell(base + 1),
                self.cell(base + 2)
            )?;
        }
        Ok(())
    }
}

/// Everything the terminal shows for one session: board (when live),
/// role and the status line.
pub struct SessionView<'a> {
    session: &'a SessionFsm,
}

impl<'a> SessionView<'a> {
    pub fn new(session: &'a SessionFsm) -> Self {
        Self { session }
    }
}

impl fmt::Display for SessionView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (SessionPhase::Connected, Some(game), Some(role)) =
            (self.session.phase(), self.session.game(), self.session.role())
        {
            writeln!(f)?;
            write!(f, "{}", BoardView::new(game))?;
            writeln!(f, "You are {} ({})", role.symbol(), role)?;
        }
        write!(f, "{}", self.session.status())
    }
}
