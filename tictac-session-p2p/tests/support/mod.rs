pub mod memory_link;

use memory_link::MemoryLink;
use tictac_session_core::{GameState, Role};
use tictac_session_p2p::{
    ManualSignaling, SessionChannel, SessionConfig, SessionFsm, SessionPhase, UserAction,
};

/// Route test logs through the libtest writer. Safe to call more than once.
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Two session machines already wired together in memory
pub struct GameFixture {
    pub host: SessionFsm,
    pub joiner: SessionFsm,
}

impl GameFixture {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::local())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        init_test_tracing();

        let (host_link, joiner_link) = MemoryLink::pair();
        let mut host = SessionFsm::new(config.clone(), ManualSignaling::new());
        let mut joiner = SessionFsm::new(config, ManualSignaling::new());

        host.connect_with_channel(Role::Host, SessionChannel::new(Box::new(host_link)))
            .unwrap();
        joiner
            .connect_with_channel(Role::Joiner, SessionChannel::new(Box::new(joiner_link)))
            .unwrap();

        Self { host, joiner }
    }

    /// Poll both sides `count` times, host first
    pub fn tick(&mut self, count: usize) {
        for _ in 0..count {
            self.host.poll();
            self.joiner.poll();
        }
    }

    pub fn host_plays(&mut self, position: usize) {
        self.host.submit(UserAction::Play(position)).unwrap();
        self.tick(2);
    }

    pub fn joiner_plays(&mut self, position: usize) {
        self.joiner.submit(UserAction::Play(position)).unwrap();
        self.tick(2);
    }

    pub fn host_game(&self) -> GameState {
        *self.host.game().expect("host should be in a game")
    }

    pub fn joiner_game(&self) -> GameState {
        *self.joiner.game().expect("joiner should be in a game")
    }

    /// Both replicas equal and both sides still connected
    pub fn assert_converged(&self) {
        assert_eq!(self.host.phase(), SessionPhase::Connected);
        assert_eq!(self.joiner.phase(), SessionPhase::Connected);
        assert_eq!(
            self.host_game(),
            self.joiner_game(),
            "replicas diverged: host status {:?}, joiner status {:?}",
            self.host.status(),
            self.joiner.status()
        );
    }
}
