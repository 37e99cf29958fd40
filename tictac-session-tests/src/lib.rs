use cucumber::World;
use tictac_session_core::{GameCommand, GameEvent, GameState, GameStateMachine, Role};
use tictac_session_p2p::{GameProtocol, ProtocolError, ProtocolMessage};

/// One replica per role plus a wire that only delivers when told to
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct GameWorld {
    /// Single-board machine for rule scenarios
    pub machine: GameStateMachine,

    /// Last event from `machine` (for assertions)
    pub last_event: Option<GameEvent>,

    pub host: GameProtocol,
    pub joiner: GameProtocol,

    /// Messages sent but not yet delivered, per receiving role
    pub to_host: Vec<ProtocolMessage>,
    pub to_joiner: Vec<ProtocolMessage>,

    /// Last local or remote protocol error
    pub last_error: Option<ProtocolError>,
}

impl GameWorld {
    pub fn new() -> Self {
        Self {
            machine: GameStateMachine::new(),
            last_event: None,
            host: GameProtocol::new(Role::Host, 3),
            joiner: GameProtocol::new(Role::Joiner, 3),
            to_host: Vec::new(),
            to_joiner: Vec::new(),
            last_error: None,
        }
    }

    /// Run a command against the single-board machine
    pub fn execute(&mut self, command: GameCommand) -> &GameEvent {
        let event = self.machine.handle_command(command);
        self.last_event.insert(event)
    }

    pub fn last_event(&self) -> &GameEvent {
        self.last_event.as_ref().expect("No command executed yet")
    }

    pub fn replica(&self, role: Role) -> &GameState {
        match role {
            Role::Host => self.host.state(),
            Role::Joiner => self.joiner.state(),
        }
    }

    /// Local move; on success the message is queued for the other side
    pub fn play(&mut self, role: Role, position: usize) {
        let (local, outbox) = match role {
            Role::Host => (&mut self.host, &mut self.to_joiner),
            Role::Joiner => (&mut self.joiner, &mut self.to_host),
        };

        match local.play_local(position) {
            Ok(pending) => {
                outbox.push(pending.message);
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(e),
        }
    }

    pub fn restart(&mut self, role: Role) {
        let (local, outbox) = match role {
            Role::Host => (&mut self.host, &mut self.to_joiner),
            Role::Joiner => (&mut self.joiner, &mut self.to_host),
        };
        outbox.push(local.restart_local().message);
    }

    /// Inject a message as if `role` received it from the wire
    pub fn receive(&mut self, role: Role, message: ProtocolMessage) {
        let replica = match role {
            Role::Host => &mut self.host,
            Role::Joiner => &mut self.joiner,
        };
        if let Err(e) = replica.receive(&message) {
            self.last_error = Some(e);
        }
    }

    /// Deliver everything in flight, in order
    pub fn deliver(&mut self) {
        for message in std::mem::take(&mut self.to_joiner) {
            self.receive(Role::Joiner, message);
        }
        for message in std::mem::take(&mut self.to_host) {
            self.receive(Role::Host, message);
        }
    }
}

impl Default for GameWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// "host" / "joiner" as used in feature files
pub fn parse_role(name: &str) -> Role {
    match name.trim().to_ascii_lowercase().as_str() {
        "host" => Role::Host,
        "joiner" => Role::Joiner,
        other => panic!("Unknown role '{}'", other),
    }
}
