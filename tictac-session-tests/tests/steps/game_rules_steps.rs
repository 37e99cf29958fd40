use cucumber::{given, then, when};
use tictac_session_core::{
    compute_winner, Board, GameCommand, GameError, GameEvent, Outcome, Symbol, BOARD_SIZE,
};
use tictac_session_tests::GameWorld;

fn parse_symbol(name: &str) -> Symbol {
    match name {
        "X" => Symbol::X,
        "O" => Symbol::O,
        other => panic!("Unknown symbol '{}'", other),
    }
}

/// `"X0 O4 X8"` style move list
fn parse_moves(moves: &str) -> Vec<(Symbol, usize)> {
    moves
        .split_whitespace()
        .map(|token| {
            let (symbol, position) = token.split_at(1);
            (
                parse_symbol(symbol),
                position.parse().expect("position must be a number"),
            )
        })
        .collect()
}

// ===== Given Steps =====

#[given("a new game")]
async fn new_game(world: &mut GameWorld) {
    *world = GameWorld::new();
}

#[given(expr = "the moves {string} have been played")]
async fn moves_played(world: &mut GameWorld, moves: String) {
    for (symbol, position) in parse_moves(&moves) {
        let event = world.execute(GameCommand::Move { position, symbol });
        assert!(!event.is_failure(), "setup move failed: {:?}", event);
    }
}

// ===== When Steps =====

#[when(expr = "{word} marks cell {int}")]
async fn marks_cell(world: &mut GameWorld, symbol: String, position: usize) {
    world.execute(GameCommand::Move {
        position,
        symbol: parse_symbol(&symbol),
    });
}

#[when("the game is restarted")]
async fn game_restarted(world: &mut GameWorld) {
    world.execute(GameCommand::Restart);
}

// ===== Then Steps =====

#[then(expr = "cell {int} holds {word}")]
async fn cell_holds(world: &mut GameWorld, position: usize, symbol: String) {
    assert_eq!(
        world.machine.state().board().cell(position),
        Some(parse_symbol(&symbol))
    );
}

#[then(expr = "the next player is {word}")]
async fn next_player(world: &mut GameWorld, symbol: String) {
    assert_eq!(world.machine.state().turn_owner(), parse_symbol(&symbol));
}

#[then(expr = "the winner is {word}")]
async fn winner_is(world: &mut GameWorld, symbol: String) {
    assert_eq!(
        world.machine.state().winner(),
        Outcome::Won(parse_symbol(&symbol))
    );
}

#[then("the game is a draw")]
async fn game_is_draw(world: &mut GameWorld) {
    assert_eq!(world.machine.state().winner(), Outcome::Draw);
    assert_eq!(world.machine.state().status_line(), "It's a draw!");
}

#[then("the game is undecided")]
async fn game_undecided(world: &mut GameWorld) {
    assert_eq!(world.machine.state().winner(), Outcome::None);
}

#[then("the board is empty")]
async fn board_is_empty(world: &mut GameWorld) {
    assert_eq!(world.machine.state().board().filled_count(), 0);
}

#[then(expr = "the move is rejected as {string}")]
async fn move_rejected(world: &mut GameWorld, kind: String) {
    let reason = match world.last_event() {
        GameEvent::CommandFailed { reason, .. } => *reason,
        other => panic!("Expected a rejected move, got {:?}", other),
    };

    let matches = match kind.as_str() {
        "out of range" => matches!(reason, GameError::OutOfRange(_)),
        "occupied" => matches!(reason, GameError::CellOccupied(_)),
        "game over" => matches!(reason, GameError::GameOver),
        "out of turn" => matches!(reason, GameError::OutOfTurn { .. }),
        other => panic!("Unknown rejection kind '{}'", other),
    };
    assert!(matches, "Expected {}, got {:?}", kind, reason);
}

#[then(expr = "a board with {word} on cells {int}, {int} and {int} is won by {word}")]
async fn line_is_won(
    _world: &mut GameWorld,
    symbol: String,
    a: usize,
    b: usize,
    c: usize,
    winner: String,
) {
    let mut cells = [None; BOARD_SIZE];
    for position in [a, b, c] {
        cells[position] = Some(parse_symbol(&symbol));
    }

    assert_eq!(
        compute_winner(&Board::from_cells(cells)),
        Outcome::Won(parse_symbol(&winner))
    );
}
