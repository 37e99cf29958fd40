use crate::infrastructure::error::ProtocolError;
use crate::infrastructure::message::ProtocolMessage;
use tictac_session_core::{
    GameCommand, GameError, GameEvent, GameState, GameStateMachine, Role, BOARD_SIZE,
};

/// A local change already applied to the replica but not yet on the wire.
///
/// Hand it back to [`GameProtocol::rollback`] if sending fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub message: ProtocolMessage,
    previous: GameState,
}

/// Turn ownership and message validation on top of one game replica.
#[derive(Debug, Clone)]
pub struct GameProtocol {
    role: Role,
    machine: GameStateMachine,
    desync_count: u32,
    desync_warning_threshold: u32,
}

impl GameProtocol {
    pub fn new(role: Role, desync_warning_threshold: u32) -> Self {
        Self {
            role,
            machine: GameStateMachine::new(),
            desync_count: 0,
            desync_warning_threshold,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &GameState {
        self.machine.state()
    }

    pub fn desync_count(&self) -> u32 {
        self.desync_count
    }

    /// Repeated desyncs point at a bad link or a misbehaving peer
    pub fn desync_warning(&self) -> bool {
        self.desync_count >= self.desync_warning_threshold
    }

    /// Validate and optimistically apply a local move
    pub fn play_local(&mut self, position: usize) -> Result<PendingMove, ProtocolError> {
        let state = *self.machine.state();
        let symbol = self.role.symbol();

        if position >= BOARD_SIZE {
            return Err(ProtocolError::OutOfRange(position));
        }
        if state.is_over() {
            return Err(ProtocolError::IllegalMove(GameError::GameOver));
        }
        if state.turn_owner() != symbol {
            return Err(ProtocolError::NotYourTurn {
                expected: state.turn_owner(),
            });
        }

        match self
            .machine
            .handle_command(GameCommand::Move { position, symbol })
        {
            GameEvent::CommandFailed { reason, .. } => Err(ProtocolError::IllegalMove(reason)),
            _ => Ok(PendingMove {
                // position < BOARD_SIZE, fits in u8
                message: ProtocolMessage::Move {
                    position: position as u8,
                },
                previous: state,
            }),
        }
    }

    /// Reset locally. Either side may restart at any time.
    pub fn restart_local(&mut self) -> PendingMove {
        let previous = *self.machine.state();
        self.machine.handle_command(GameCommand::Restart);
        PendingMove {
            message: ProtocolMessage::Restart,
            previous,
        }
    }

    /// Undo a local change whose message never left
    pub fn rollback(&mut self, pending: PendingMove) {
        tracing::debug!("↩️  Rolling back {:?}", pending.message);
        self.machine.restore(pending.previous);
    }

    /// Apply a message from the remote peer.
    ///
    /// Rejected moves leave the replica untouched.
    pub fn receive(&mut self, message: &ProtocolMessage) -> Result<GameEvent, ProtocolError> {
        match *message {
            ProtocolMessage::Move { position } => self.receive_move(position as usize),
            ProtocolMessage::Restart => Ok(self.machine.handle_command(GameCommand::Restart)),
        }
    }

    fn receive_move(&mut self, position: usize) -> Result<GameEvent, ProtocolError> {
        let state = *self.machine.state();
        let remote = self.role.remote().symbol();

        if position >= BOARD_SIZE {
            return Err(ProtocolError::OutOfRange(position));
        }
        if state.is_over() {
            return Err(ProtocolError::IllegalMove(GameError::GameOver));
        }
        if state.turn_owner() != remote {
            return Err(self.desync(format!(
                "{} moved to {} but it is {}'s turn",
                remote,
                position,
                state.turn_owner()
            )));
        }
        if state.board().is_occupied(position) {
            return Err(self.desync(format!(
                "{} moved to occupied cell {}",
                remote, position
            )));
        }

        match self.machine.handle_command(GameCommand::Move {
            position,
            symbol: remote,
        }) {
            GameEvent::CommandFailed { reason, .. } => Err(ProtocolError::IllegalMove(reason)),
            event => Ok(event),
        }
    }

    fn desync(&mut self, detail: String) -> ProtocolError {
        self.desync_count += 1;
        tracing::warn!(
            "⚠️  Desync #{} ({} local): {}",
            self.desync_count,
            self.role,
            detail
        );
        ProtocolError::Desync(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictac_session_core::{Outcome, Symbol};

    fn pair() -> (GameProtocol, GameProtocol) {
        (
            GameProtocol::new(Role::Host, 3),
            GameProtocol::new(Role::Joiner, 3),
        )
    }

    #[test]
    fn test_local_move_checks_turn() {
        let (_, mut joiner) = pair();
        assert_eq!(
            joiner.play_local(4),
            Err(ProtocolError::NotYourTurn {
                expected: Symbol::X
            })
        );
        assert_eq!(*joiner.state(), GameState::new());
    }

    #[test]
    fn test_move_is_relayed() {
        let (mut host, mut joiner) = pair();

        let pending = host.play_local(4).unwrap();
        assert_eq!(pending.message, ProtocolMessage::Move { position: 4 });

        joiner.receive(&pending.message).unwrap();
        assert_eq!(joiner.state().board().cell(4), Some(Symbol::X));
        assert_eq!(joiner.state().turn_owner(), Symbol::O);
        assert_eq!(host.state(), joiner.state());
    }

    #[test]
    fn test_rollback_restores_previous_replica() {
        let (mut host, _) = pair();
        let pending = host.play_local(0).unwrap();
        assert_eq!(host.state().board().cell(0), Some(Symbol::X));

        host.rollback(pending);
        assert_eq!(*host.state(), GameState::new());
    }

    #[test]
    fn test_remote_out_of_turn_is_desync() {
        let (mut host, _) = pair();

        let result = host.receive(&ProtocolMessage::Move { position: 0 });

        assert!(matches!(result, Err(ProtocolError::Desync(_))));
        assert_eq!(host.desync_count(), 1);
        assert_eq!(*host.state(), GameState::new());
    }

    #[test]
    fn test_remote_occupied_cell_is_desync() {
        let (mut host, mut joiner) = pair();
        let pending = host.play_local(4).unwrap();
        joiner.receive(&pending.message).unwrap();

        let before = *host.state();
        let result = host.receive(&ProtocolMessage::Move { position: 4 });

        assert!(matches!(result, Err(ProtocolError::Desync(_))));
        assert_eq!(*host.state(), before);
    }

    #[test]
    fn test_remote_out_of_range_checked_first() {
        let (mut host, _) = pair();
        let result = host.receive(&ProtocolMessage::Move { position: 9 });

        assert_eq!(result, Err(ProtocolError::OutOfRange(9)));
        assert_eq!(host.desync_count(), 0);
    }

    #[test]
    fn test_move_after_win_is_game_over() {
        let (mut host, mut joiner) = pair();
        // X: 0, 4, 8 / O: 1, 2
        for (mover, position) in [(0, 0), (1, 1), (0, 4), (1, 2), (0, 8)] {
            let (local, remote) = if mover == 0 {
                (&mut host, &mut joiner)
            } else {
                (&mut joiner, &mut host)
            };
            let pending = local.play_local(position).unwrap();
            remote.receive(&pending.message).unwrap();
        }

        assert_eq!(joiner.state().winner(), Outcome::Won(Symbol::X));
        assert_eq!(
            host.receive(&ProtocolMessage::Move { position: 3 }),
            Err(ProtocolError::IllegalMove(GameError::GameOver))
        );
        assert_eq!(
            joiner.play_local(3),
            Err(ProtocolError::IllegalMove(GameError::GameOver))
        );
    }

    #[test]
    fn test_restart_has_no_veto() {
        let (mut host, mut joiner) = pair();
        let pending = host.play_local(4).unwrap();
        joiner.receive(&pending.message).unwrap();

        let restart = joiner.restart_local();
        host.receive(&restart.message).unwrap();

        assert_eq!(*host.state(), GameState::new());
        assert_eq!(*joiner.state(), GameState::new());
    }

    #[test]
    fn test_desync_warning_threshold() {
        let mut host = GameProtocol::new(Role::Host, 2);
        let bogus = ProtocolMessage::Move { position: 0 };

        let _ = host.receive(&bogus);
        assert!(!host.desync_warning());
        let _ = host.receive(&bogus);
        assert!(host.desync_warning());
    }
}
