use cucumber::{given, then, when};
use tictac_session_core::{GameState, Outcome, Symbol};
use tictac_session_p2p::{ProtocolError, ProtocolMessage};
use tictac_session_tests::{parse_role, GameWorld};

// ===== Given Steps =====

#[given("a connected host and joiner")]
async fn connected_pair(world: &mut GameWorld) {
    *world = GameWorld::new();
}

// ===== When Steps =====

#[when(expr = "the {word} plays {int}")]
async fn role_plays(world: &mut GameWorld, role: String, position: usize) {
    world.play(parse_role(&role), position);
}

#[when(expr = "the {word} restarts the game")]
async fn role_restarts(world: &mut GameWorld, role: String) {
    world.restart(parse_role(&role));
}

#[when("the messages are delivered")]
async fn messages_delivered(world: &mut GameWorld) {
    world.deliver();
}

#[when(expr = "the {word} plays {int} and it is delivered")]
async fn role_plays_delivered(world: &mut GameWorld, role: String, position: usize) {
    world.play(parse_role(&role), position);
    world.deliver();
}

#[when(expr = "the {word} receives a move to {int}")]
async fn role_receives_move(world: &mut GameWorld, role: String, position: u8) {
    world.receive(parse_role(&role), ProtocolMessage::Move { position });
}

// ===== Then Steps =====

#[then("both replicas are equal")]
async fn replicas_equal(world: &mut GameWorld) {
    assert_eq!(world.host.state(), world.joiner.state());
}

#[then("both replicas are empty")]
async fn replicas_empty(world: &mut GameWorld) {
    assert_eq!(*world.host.state(), GameState::new());
    assert_eq!(*world.joiner.state(), GameState::new());
}

#[then(expr = "the {word} sees {word} at cell {int}")]
async fn role_sees_symbol(world: &mut GameWorld, role: String, symbol: String, position: usize) {
    let expected = match symbol.as_str() {
        "X" => Symbol::X,
        "O" => Symbol::O,
        other => panic!("Unknown symbol '{}'", other),
    };
    assert_eq!(
        world.replica(parse_role(&role)).board().cell(position),
        Some(expected)
    );
}

#[then(expr = "the {word} sees cell {int} empty")]
async fn role_sees_empty(world: &mut GameWorld, role: String, position: usize) {
    assert_eq!(world.replica(parse_role(&role)).board().cell(position), None);
}

#[then(expr = "the {word} waits for {word}")]
async fn role_waits_for(world: &mut GameWorld, role: String, symbol: String) {
    assert_eq!(
        world.replica(parse_role(&role)).turn_owner().to_string(),
        symbol
    );
}

#[then(expr = "both replicas report winner {word}")]
async fn both_report_winner(world: &mut GameWorld, symbol: String) {
    for state in [world.host.state(), world.joiner.state()] {
        match state.winner() {
            Outcome::Won(winner) => assert_eq!(winner.to_string(), symbol),
            other => panic!("Expected a winner, got {:?}", other),
        }
    }
}

#[then("the play is refused as not your turn")]
async fn refused_not_your_turn(world: &mut GameWorld) {
    assert!(matches!(
        world.last_error,
        Some(ProtocolError::NotYourTurn { .. })
    ));
}

#[then("the message is discarded as a desync")]
async fn discarded_as_desync(world: &mut GameWorld) {
    assert!(matches!(world.last_error, Some(ProtocolError::Desync(_))));
}

#[then(expr = "the {word} has counted {int} desync(s)")]
async fn desync_count(world: &mut GameWorld, role: String, count: u32) {
    let replica = match parse_role(&role) {
        tictac_session_core::Role::Host => &world.host,
        tictac_session_core::Role::Joiner => &world.joiner,
    };
    assert_eq!(replica.desync_count(), count);
}

#[then("nothing is in flight")]
async fn nothing_in_flight(world: &mut GameWorld) {
    assert!(world.to_host.is_empty());
    assert!(world.to_joiner.is_empty());
}
