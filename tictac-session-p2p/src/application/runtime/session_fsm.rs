use crate::application::runtime::EventQueue;
use crate::application::{
    ChannelEvent, ConnectionEvent, ConnectionManager, GameProtocol, SessionChannel,
    SessionConfig, SessionEvent, UserAction,
};
use crate::domain::ConnectionState;
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::message::ProtocolMessage;
use crate::infrastructure::signaling::{SignalingChannel, SignalingToken};
use std::collections::VecDeque;
use std::fmt;
use tictac_session_core::{GameState, Role};

/// Where the user is in the session flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Menu,
    /// Offer published, waiting for the answer and the link
    Hosting,
    /// Waiting for the user to supply an offer token
    JoinEntry,
    /// Answer published, link being established
    Joining,
    /// Link open, game live
    Connected,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Menu => write!(f, "in menu"),
            SessionPhase::Hosting => write!(f, "hosting"),
            SessionPhase::JoinEntry => write!(f, "entering join token"),
            SessionPhase::Joining => write!(f, "joining"),
            SessionPhase::Connected => write!(f, "connected"),
        }
    }
}

/// Everything that lives exactly as long as one game session.
///
/// Dropping it closes the link and aborts every background task.
struct ActiveSession {
    role: Role,
    manager: Option<ConnectionManager>,
    channel: Option<SessionChannel>,
    protocol: GameProtocol,
}

impl ActiveSession {
    fn new(role: Role, manager: Option<ConnectionManager>, desync_threshold: u32) -> Self {
        Self {
            role,
            manager,
            channel: None,
            protocol: GameProtocol::new(role, desync_threshold),
        }
    }

    fn status(&self) -> String {
        let line = self.protocol.state().status_line();
        if self.protocol.desync_warning() {
            format!(
                "{} (connection quality warning: {} desyncs)",
                line,
                self.protocol.desync_count()
            )
        } else {
            line
        }
    }

    fn play(&mut self, position: usize) -> String {
        let Some(channel) = self.channel.as_mut() else {
            return "Not connected yet".to_string();
        };

        match self.protocol.play_local(position) {
            Ok(pending) => match channel.send(&pending.message) {
                Ok(()) => self.status(),
                Err(e) => {
                    self.protocol.rollback(pending);
                    format!("Move not sent: {}", e)
                }
            },
            Err(e) => e.to_string(),
        }
    }

    fn restart(&mut self) -> String {
        let Some(channel) = self.channel.as_mut() else {
            return "Not connected yet".to_string();
        };

        let pending = self.protocol.restart_local();
        match channel.send(&pending.message) {
            Ok(()) => self.status(),
            Err(e) => {
                self.protocol.rollback(pending);
                format!("Restart not sent: {}", e)
            }
        }
    }

    fn receive(&mut self, message: ProtocolMessage) -> String {
        match self.protocol.receive(&message) {
            Ok(_) => self.status(),
            Err(e) => {
                tracing::warn!("⚠️  Discarded remote {:?}: {}", message, e);
                format!("Ignored remote move: {}", e)
            }
        }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.close();
        }
        if let Some(manager) = self.manager.as_mut() {
            manager.close();
        }
    }
}

/// Per-client session state machine.
///
/// ```text
/// Menu -> Hosting ---------------> Connected -> Menu
/// Menu -> JoinEntry -> Joining --> Connected -> Menu
/// ```
///
/// All state changes happen inside [`poll`](Self::poll), one queued event at
/// a time. Local actions go through a bounded queue; events already taken
/// off the link are buffered separately and never refused.
pub struct SessionFsm {
    config: SessionConfig,
    signaling: Box<dyn SignalingChannel>,
    phase: SessionPhase,
    active: Option<ActiveSession>,
    queue: EventQueue,
    inbound: VecDeque<SessionEvent>,
    status: String,
    expected_answer: Option<SignalingToken>,
}

impl SessionFsm {
    pub fn new(config: SessionConfig, signaling: impl SignalingChannel + 'static) -> Self {
        Self::with_boxed_signaling(config, Box::new(signaling))
    }

    /// For callers that pick the signaling transport at runtime
    pub fn with_boxed_signaling(config: SessionConfig, signaling: Box<dyn SignalingChannel>) -> Self {
        let queue = EventQueue::new(config.event_queue_size);
        Self {
            config,
            signaling,
            phase: SessionPhase::Menu,
            active: None,
            queue,
            inbound: VecDeque::new(),
            status: "Host or join a game".to_string(),
            expected_answer: None,
        }
    }

    // ===== Getters =====

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The one user-visible status line
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Local replica, once the game is live
    pub fn game(&self) -> Option<&GameState> {
        self.active
            .as_ref()
            .filter(|active| active.channel.is_some())
            .map(|active| active.protocol.state())
    }

    pub fn role(&self) -> Option<Role> {
        self.active.as_ref().map(|active| active.role)
    }

    pub fn desync_count(&self) -> u32 {
        self.active
            .as_ref()
            .map(|active| active.protocol.desync_count())
            .unwrap_or(0)
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.active
            .as_ref()
            .and_then(|active| active.manager.as_ref())
            .map(|manager| manager.state())
    }

    /// Where the answer will appear, for transports that can tell in advance
    pub fn expected_answer_token(&self) -> Option<&SignalingToken> {
        self.expected_answer.as_ref()
    }

    // ===== Negotiation =====

    /// Build and publish an offer. Returns the token to share.
    pub async fn host(&mut self) -> Result<SignalingToken> {
        self.require(SessionPhase::Menu, "host")?;
        self.phase = SessionPhase::Hosting;
        self.status = "Preparing offer...".to_string();

        let mut manager = ConnectionManager::new(self.config.clone());
        let offer = match manager.initiate_as_host().await {
            Ok(offer) => offer,
            Err(e) => return Err(self.abandon(e, "Could not host")),
        };

        let token = match self.signaling.publish(&offer).await {
            Ok(token) => token,
            Err(e) => return Err(self.abandon(e, "Could not publish offer")),
        };

        self.expected_answer = self.signaling.answer_token(&token);
        self.active = Some(ActiveSession::new(
            Role::Host,
            Some(manager),
            self.config.desync_warning_threshold,
        ));
        self.status = "Waiting for opponent...".to_string();
        tracing::info!("🎮 Hosting, offer token published");
        Ok(token)
    }

    /// Fetch and apply the joiner's answer. Failures keep the offer open.
    pub async fn accept_answer(&mut self, token: &SignalingToken) -> Result<()> {
        self.require(SessionPhase::Hosting, "accept an answer")?;

        let answer = match self.signaling.retrieve(token).await {
            Ok(answer) => answer,
            Err(e) => {
                self.status = format!("Could not retrieve answer: {}", e);
                return Err(e);
            }
        };

        let Some(manager) = self
            .active
            .as_mut()
            .and_then(|active| active.manager.as_mut())
        else {
            return Err(SessionError::InvalidPhase(
                "hosting without a negotiation".to_string(),
            ));
        };

        match manager.complete_as_host(answer) {
            Ok(()) => {
                self.status = "Connecting...".to_string();
                Ok(())
            }
            Err(e) => {
                self.status = format!("Invalid answer: {}", e);
                Err(e)
            }
        }
    }

    pub fn open_join_entry(&mut self) -> Result<()> {
        self.require(SessionPhase::Menu, "join")?;
        self.phase = SessionPhase::JoinEntry;
        self.status = "Enter the host's offer".to_string();
        Ok(())
    }

    /// Fetch the offer, publish an answer and start connecting.
    /// Returns the answer token for the host.
    pub async fn join(&mut self, token: &SignalingToken) -> Result<SignalingToken> {
        self.require(SessionPhase::JoinEntry, "join")?;
        self.phase = SessionPhase::Joining;
        self.status = "Reading offer...".to_string();

        let offer = match self.signaling.retrieve(token).await {
            Ok(offer) => offer,
            Err(e @ SessionError::InvalidHandshake(_)) => {
                return Err(self.back_to_join_entry(e, "Could not read offer"))
            }
            Err(e) => return Err(self.abandon(e, "Could not read offer")),
        };

        let mut manager = ConnectionManager::new(self.config.clone());
        let answer = match manager.accept_as_joiner(offer).await {
            Ok(answer) => answer,
            Err(e @ SessionError::InvalidHandshake(_)) => {
                return Err(self.back_to_join_entry(e, "Invalid offer"))
            }
            Err(e) => return Err(self.abandon(e, "Could not join")),
        };

        let answer_token = match self.signaling.publish(&answer).await {
            Ok(answer_token) => answer_token,
            Err(e) => return Err(self.abandon(e, "Could not publish answer")),
        };

        self.active = Some(ActiveSession::new(
            Role::Joiner,
            Some(manager),
            self.config.desync_warning_threshold,
        ));
        self.status = "Answer published, connecting...".to_string();
        tracing::info!("🎮 Joining, answer token published");
        Ok(answer_token)
    }

    /// Start a game over a channel negotiated elsewhere
    pub fn connect_with_channel(&mut self, role: Role, channel: SessionChannel) -> Result<()> {
        self.require(SessionPhase::Menu, "connect")?;

        let mut active = ActiveSession::new(role, None, self.config.desync_warning_threshold);
        active.channel = Some(channel);
        self.status = format!("Connected as {} ({}). {}", role, role.symbol(), active.status());
        self.active = Some(active);
        self.phase = SessionPhase::Connected;
        Ok(())
    }

    // ===== Event loop =====

    /// Queue a local action; it takes effect on the next `poll`
    pub fn submit(&mut self, action: UserAction) -> Result<()> {
        self.queue.push(SessionEvent::Local(action))?;
        Ok(())
    }

    /// Pull connection and channel events in, then process queued local
    /// actions followed by link events, each in FIFO order.
    /// Returns the number of events processed.
    pub fn poll(&mut self) -> usize {
        self.pump();

        let mut processed = 0;
        while let Some(event) = self.queue.pop().or_else(|| self.inbound.pop_front()) {
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    /// Tear the session down from any phase. Nothing queued survives.
    pub fn leave(&mut self) {
        self.teardown("Left the session".to_string());
    }

    // ===== Internals =====

    fn require(&self, expected: SessionPhase, action: &str) -> Result<()> {
        if self.phase != expected {
            return Err(SessionError::InvalidPhase(format!(
                "{} (cannot {})",
                self.phase, action
            )));
        }
        Ok(())
    }

    fn pump(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        if let Some(manager) = active.manager.as_mut() {
            self.inbound
                .extend(manager.poll_events().into_iter().map(SessionEvent::Connection));
        }
        if let Some(channel) = active.channel.as_mut() {
            self.inbound
                .extend(channel.poll().into_iter().map(SessionEvent::Channel));
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connection(ConnectionEvent::StateChanged(state)) => {
                tracing::debug!("Connection is {}", state);
            }
            SessionEvent::Connection(ConnectionEvent::ChannelReady(channel)) => {
                self.on_channel_ready(channel);
            }
            SessionEvent::Connection(ConnectionEvent::Failed { reason, detail }) => {
                self.teardown(format!("Connection {}: {}", reason, detail));
            }
            SessionEvent::Channel(ChannelEvent::Message(message)) => {
                if let Some(active) = self.active.as_mut() {
                    self.status = active.receive(message);
                }
            }
            SessionEvent::Channel(ChannelEvent::Closed { reason }) => {
                if let Some(manager) = self
                    .active
                    .as_mut()
                    .and_then(|active| active.manager.as_mut())
                {
                    manager.on_channel_closed(&reason);
                }
                self.teardown(format!("Connection lost: {}", reason));
            }
            SessionEvent::Local(UserAction::Play(position)) => {
                self.status = match self.active.as_mut() {
                    Some(active) => active.play(position),
                    None => "Not in a game".to_string(),
                };
            }
            SessionEvent::Local(UserAction::Restart) => {
                self.status = match self.active.as_mut() {
                    Some(active) => active.restart(),
                    None => "Not in a game".to_string(),
                };
            }
            SessionEvent::Local(UserAction::Leave) => self.leave(),
        }
    }

    fn on_channel_ready(&mut self, channel: SessionChannel) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        active.channel = Some(channel);
        self.phase = SessionPhase::Connected;
        self.status = format!(
            "Connected as {} ({}). {}",
            active.role,
            active.role.symbol(),
            active.status()
        );
        tracing::info!("✅ {}", self.status);
    }

    fn teardown(&mut self, status: String) {
        // Drop first: aborts tasks and closes the link before anything else runs
        self.active = None;
        let dropped = self.queue.clear() + self.inbound.len();
        self.inbound.clear();

        self.phase = SessionPhase::Menu;
        self.expected_answer = None;
        tracing::info!("🔴 Session ended: {} ({} queued events dropped)", status, dropped);
        self.status = status;
    }

    fn abandon(&mut self, error: SessionError, context: &str) -> SessionError {
        self.teardown(format!("{}: {}", context, error));
        error
    }

    fn back_to_join_entry(&mut self, error: SessionError, context: &str) -> SessionError {
        self.phase = SessionPhase::JoinEntry;
        self.status = format!("{}: {}", context, error);
        error
    }
}
