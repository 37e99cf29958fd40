use crate::application::{ConnectionEvent, SessionChannel, SessionConfig};
use crate::domain::{
    Candidate, ConnectionState, FailureReason, HandshakeBlob, HandshakeRole, PeerIdentity,
    SessionId,
};
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::message::{read_frame, write_frame, ControlFrame};
use crate::infrastructure::tcp_link::TcpLink;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;
use tictac_session_core::Role;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::Instrument;

/// Reports from background tasks. Tasks never touch manager state directly.
enum TaskReport {
    Established { link: TcpLink, peer: PeerIdentity },
    Failed { reason: FailureReason, detail: String },
}

/// Drives one peer link from nothing to an open channel or a classified failure.
///
/// ```text
/// host:   Idle -> NegotiatingLocal -> AwaitingRemote -> Connecting -> Open
/// joiner: Idle -> NegotiatingLocal -> Connecting -> Open
/// ```
///
/// Background work (accept loop, dialer) reports through a channel that
/// [`poll_events`](Self::poll_events) drains. Dropping the manager aborts it.
pub struct ConnectionManager {
    config: SessionConfig,
    local_peer: PeerIdentity,
    role: Option<Role>,
    state: ConnectionState,
    session_id: Option<SessionId>,
    remote_peer: Option<PeerIdentity>,
    local_addr: Option<SocketAddr>,

    reports_tx: mpsc::UnboundedSender<TaskReport>,
    reports_rx: mpsc::UnboundedReceiver<TaskReport>,

    /// Set once the answer is applied; the accept task holds the hello until then
    expected_joiner: Option<watch::Sender<Option<PeerIdentity>>>,

    pending: VecDeque<ConnectionEvent>,
    tasks: Vec<JoinHandle<()>>,
    deadline: Option<(Instant, &'static str)>,
    span: tracing::Span,
}

impl ConnectionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_identity(config, PeerIdentity::generate())
    }

    pub fn with_identity(config: SessionConfig, local_peer: PeerIdentity) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let span = tracing::info_span!(
            "connection",
            role = tracing::field::Empty,
            peer = local_peer.short()
        );

        Self {
            config,
            local_peer,
            role: None,
            state: ConnectionState::Idle,
            session_id: None,
            remote_peer: None,
            local_addr: None,
            reports_tx,
            reports_rx,
            expected_joiner: None,
            pending: VecDeque::new(),
            tasks: Vec::new(),
            deadline: None,
            span,
        }
    }

    // ===== Getters =====

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn local_peer(&self) -> &PeerIdentity {
        &self.local_peer
    }

    pub fn remote_peer(&self) -> Option<&PeerIdentity> {
        self.remote_peer.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Address of the host listener
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    // ===== Negotiation =====

    /// Bind a listener, discover candidates and build the offer
    pub async fn initiate_as_host(&mut self) -> Result<HandshakeBlob> {
        self.require(ConnectionState::Idle, "start hosting")?;
        self.assign_role(Role::Host);
        self.set_state(ConnectionState::NegotiatingLocal);

        let listener = match TcpListener::bind(self.config.bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                let detail = format!("cannot bind {}: {}", self.config.bind_addr, e);
                return Err(self.abort_negotiation(SessionError::Negotiation(detail)));
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => return Err(self.abort_negotiation(e.into())),
        };
        self.local_addr = Some(local_addr);
        tracing::info!(parent: &self.span, "👂 Listening on {}", local_addr);

        let candidates = match self.config.gatherer().gather(local_addr.port()).await {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.abort_negotiation(e)),
        };

        let session_id = SessionId::new();
        let offer = HandshakeBlob::offer(session_id, self.local_peer.clone(), candidates);

        let (expected_tx, expected_rx) = watch::channel(None);
        let context = HostContext {
            session_id,
            local_peer: self.local_peer.clone(),
            hello_timeout: self.config.hello_timeout,
            max_frame_size: self.config.max_frame_size,
        };
        let task = tokio::spawn(
            run_host_accept(listener, context, expected_rx, self.reports_tx.clone())
                .instrument(self.span.clone()),
        );

        self.tasks.push(task);
        self.expected_joiner = Some(expected_tx);
        self.session_id = Some(session_id);
        self.deadline = Some((
            Instant::now() + self.config.answer_timeout,
            "no answer arrived",
        ));
        self.set_state(ConnectionState::AwaitingRemote);

        tracing::info!(parent: &self.span, "📋 Offer ready for session {}", session_id);
        Ok(offer)
    }

    /// Apply a host's offer, build the answer and start dialing
    pub async fn accept_as_joiner(&mut self, remote: HandshakeBlob) -> Result<HandshakeBlob> {
        self.require(ConnectionState::Idle, "accept an offer")?;

        if remote.role() != HandshakeRole::Offer {
            return Err(SessionError::InvalidHandshake(format!(
                "expected an offer, got an {}",
                remote.role()
            )));
        }
        if remote.candidates().is_empty() {
            return Err(SessionError::InvalidHandshake(
                "offer carries no candidates".to_string(),
            ));
        }
        if remote.peer() == &self.local_peer {
            return Err(SessionError::InvalidHandshake(
                "offer was created by this client".to_string(),
            ));
        }

        self.assign_role(Role::Joiner);
        self.set_state(ConnectionState::NegotiatingLocal);

        // The joiner only dials out; port 0 marks its candidates as outbound-only
        let candidates = match self.config.gatherer().gather(0).await {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.abort_negotiation(e)),
        };

        let session_id = remote.session_id();
        let answer = HandshakeBlob::answer(session_id, self.local_peer.clone(), candidates);

        let context = JoinerContext {
            session_id,
            local_peer: self.local_peer.clone(),
            host_peer: remote.peer().clone(),
            connect_timeout: self.config.connect_timeout,
            reply_timeout: self.config.answer_timeout,
            max_frame_size: self.config.max_frame_size,
        };
        let targets = Candidate::prioritize(remote.candidates().to_vec());
        let task = tokio::spawn(
            run_joiner_dial(targets, context, self.reports_tx.clone())
                .instrument(self.span.clone()),
        );

        self.tasks.push(task);
        self.session_id = Some(session_id);
        self.remote_peer = Some(remote.peer().clone());
        self.deadline = Some((
            Instant::now() + self.config.answer_timeout,
            "host never accepted the link",
        ));
        self.set_state(ConnectionState::Connecting);

        tracing::info!(parent: &self.span, "📋 Answer ready for session {}", session_id);
        Ok(answer)
    }

    /// Apply the joiner's answer. On error nothing changes, so the user can retry.
    pub fn complete_as_host(&mut self, remote: HandshakeBlob) -> Result<()> {
        self.require(ConnectionState::AwaitingRemote, "apply an answer")?;

        if remote.role() != HandshakeRole::Answer {
            return Err(SessionError::InvalidHandshake(format!(
                "expected an answer, got an {}",
                remote.role()
            )));
        }
        if self.session_id != Some(remote.session_id()) {
            return Err(SessionError::InvalidHandshake(format!(
                "answer belongs to session {}",
                remote.session_id()
            )));
        }

        let joiner = remote.peer().clone();
        tracing::info!(parent: &self.span, "🤝 Answer from {} applied", joiner.short());

        if let Some(expected) = &self.expected_joiner {
            expected.send_replace(Some(joiner.clone()));
        }
        self.remote_peer = Some(joiner);
        self.deadline = Some((
            Instant::now() + self.config.connect_timeout,
            "joiner never connected",
        ));
        self.set_state(ConnectionState::Connecting);
        Ok(())
    }

    // ===== Event loop =====

    /// Drain lifecycle events. Call regularly.
    pub fn poll_events(&mut self) -> Vec<ConnectionEvent> {
        while let Ok(report) = self.reports_rx.try_recv() {
            match report {
                TaskReport::Established { link, peer } => self.on_established(link, peer),
                TaskReport::Failed { reason, detail } => self.fail(reason, detail),
            }
        }

        if let Some((deadline, what)) = self.deadline {
            if self.state.is_waiting() && Instant::now() >= deadline {
                self.fail(FailureReason::Unreachable, format!("timed out: {}", what));
            }
        }

        self.pending.drain(..).collect()
    }

    /// The channel handed out by `ChannelReady` reported a close
    pub fn on_channel_closed(&mut self, detail: &str) -> FailureReason {
        if self.state == ConnectionState::Open {
            self.fail(FailureReason::LinkLost, detail.to_string());
        }
        FailureReason::LinkLost
    }

    /// Stop all background work
    pub fn close(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        self.set_state(ConnectionState::Closing);
        self.shutdown_tasks();
        self.set_state(ConnectionState::Closed);
    }

    // ===== Internals =====

    fn require(&self, expected: ConnectionState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(SessionError::InvalidPhase(format!(
                "{} (cannot {})",
                self.state, action
            )));
        }
        Ok(())
    }

    fn assign_role(&mut self, role: Role) {
        self.role = Some(role);
        self.span.record("role", tracing::field::display(role));
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }

        tracing::debug!(parent: &self.span, "Connection {} -> {}", self.state, state);
        self.state = state;
        self.pending.push_back(ConnectionEvent::StateChanged(state));
    }

    fn on_established(&mut self, link: TcpLink, peer: PeerIdentity) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(parent: &self.span, "Ignoring late link while {}", self.state);
            return;
        }

        tracing::info!(
            parent: &self.span,
            "🟢 Link open with {} ({:?})",
            peer.short(),
            link.peer_addr()
        );
        self.remote_peer = Some(peer);
        self.deadline = None;
        self.expected_joiner = None;
        self.set_state(ConnectionState::Open);
        self.pending
            .push_back(ConnectionEvent::ChannelReady(SessionChannel::new(Box::new(
                link,
            ))));
    }

    fn fail(&mut self, reason: FailureReason, detail: String) {
        if self.state.is_terminal() {
            return;
        }

        tracing::warn!(parent: &self.span, "❌ Connection {}: {}", reason, detail);
        self.shutdown_tasks();
        self.set_state(ConnectionState::Failed);
        self.pending
            .push_back(ConnectionEvent::Failed { reason, detail });
    }

    fn abort_negotiation(&mut self, error: SessionError) -> SessionError {
        tracing::warn!(parent: &self.span, "❌ Negotiation aborted: {}", error);
        self.shutdown_tasks();
        self.set_state(ConnectionState::Failed);
        error
    }

    fn shutdown_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.expected_joiner = None;
        self.deadline = None;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// ===== Background tasks =====

#[derive(Debug, thiserror::Error)]
enum HandshakeFailure {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Io(String),

    #[error("session abandoned")]
    Abandoned,
}

struct HostContext {
    session_id: SessionId,
    local_peer: PeerIdentity,
    hello_timeout: Duration,
    max_frame_size: usize,
}

struct JoinerContext {
    session_id: SessionId,
    local_peer: PeerIdentity,
    host_peer: PeerIdentity,
    connect_timeout: Duration,
    reply_timeout: Duration,
    max_frame_size: usize,
}

async fn run_host_accept(
    listener: TcpListener,
    context: HostContext,
    mut expected: watch::Receiver<Option<PeerIdentity>>,
    reports: mpsc::UnboundedSender<TaskReport>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        tracing::info!("📥 Incoming connection from {}", addr);
        match host_handshake(stream, &context, &mut expected).await {
            Ok((link, peer)) => {
                let _ = reports.send(TaskReport::Established { link, peer });
                return;
            }
            Err(HandshakeFailure::Abandoned) => return,
            Err(failure) => {
                tracing::warn!("⚠️  Turned away {}: {}", addr, failure);
            }
        }
    }
}

async fn host_handshake(
    mut stream: TcpStream,
    context: &HostContext,
    expected: &mut watch::Receiver<Option<PeerIdentity>>,
) -> std::result::Result<(TcpLink, PeerIdentity), HandshakeFailure> {
    let frame = timeout(
        context.hello_timeout,
        read_frame(&mut stream, context.max_frame_size),
    )
    .await
    .map_err(|_| HandshakeFailure::Io("no hello received".to_string()))?
    .map_err(|e| HandshakeFailure::Io(e.to_string()))?
    .ok_or_else(|| HandshakeFailure::Io("closed before hello".to_string()))?;

    let (session_id, peer) = match ControlFrame::decode(&frame) {
        Ok(ControlFrame::Hello { session_id, peer }) => (session_id, peer),
        _ => return Err(reject(&mut stream, "malformed hello").await),
    };

    // Hold the hello until the answer has been applied
    if expected.wait_for(|joiner| joiner.is_some()).await.is_err() {
        return Err(HandshakeFailure::Abandoned);
    }
    let expected_peer = expected.borrow().clone();

    if session_id != context.session_id {
        return Err(reject(&mut stream, "unknown session").await);
    }
    if expected_peer.as_ref() != Some(&peer) {
        return Err(reject(&mut stream, "peer does not match the answer").await);
    }

    let welcome = ControlFrame::Welcome {
        peer: context.local_peer.clone(),
    }
    .encode()
    .map_err(|e| HandshakeFailure::Io(e.to_string()))?;
    write_frame(&mut stream, &welcome)
        .await
        .map_err(|e| HandshakeFailure::Io(e.to_string()))?;

    Ok((TcpLink::spawn(stream, context.max_frame_size), peer))
}

async fn reject(stream: &mut TcpStream, reason: &str) -> HandshakeFailure {
    let frame = ControlFrame::Reject {
        reason: reason.to_string(),
    };
    if let Ok(bytes) = frame.encode() {
        if let Err(e) = write_frame(stream, &bytes).await {
            tracing::debug!("Could not deliver reject: {}", e);
        }
    }
    HandshakeFailure::Rejected(reason.to_string())
}

async fn run_joiner_dial(
    candidates: Vec<Candidate>,
    context: JoinerContext,
    reports: mpsc::UnboundedSender<TaskReport>,
) {
    let mut last_error = String::from("no candidates to dial");

    for candidate in &candidates {
        tracing::debug!("📞 Dialing {}", candidate);

        let stream = match timeout(
            context.connect_timeout,
            TcpStream::connect(candidate.address),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                last_error = format!("{}: {}", candidate.address, e);
                continue;
            }
            Err(_) => {
                last_error = format!("{}: connect timed out", candidate.address);
                continue;
            }
        };

        match joiner_handshake(stream, &context).await {
            Ok(link) => {
                tracing::info!("🟢 Connected to host via {}", candidate);
                let _ = reports.send(TaskReport::Established {
                    link,
                    peer: context.host_peer.clone(),
                });
                return;
            }
            Err(HandshakeFailure::Rejected(detail)) => {
                let _ = reports.send(TaskReport::Failed {
                    reason: FailureReason::Rejected,
                    detail,
                });
                return;
            }
            Err(failure) => {
                last_error = format!("{}: {}", candidate.address, failure);
            }
        }
    }

    let _ = reports.send(TaskReport::Failed {
        reason: FailureReason::Unreachable,
        detail: format!(
            "all {} candidates failed, last error: {}",
            candidates.len(),
            last_error
        ),
    });
}

async fn joiner_handshake(
    mut stream: TcpStream,
    context: &JoinerContext,
) -> std::result::Result<TcpLink, HandshakeFailure> {
    let hello = ControlFrame::Hello {
        session_id: context.session_id,
        peer: context.local_peer.clone(),
    }
    .encode()
    .map_err(|e| HandshakeFailure::Io(e.to_string()))?;
    write_frame(&mut stream, &hello)
        .await
        .map_err(|e| HandshakeFailure::Io(e.to_string()))?;

    // The host replies only after its user applied our answer
    let reply = timeout(
        context.reply_timeout,
        read_frame(&mut stream, context.max_frame_size),
    )
    .await
    .map_err(|_| HandshakeFailure::Io("host did not reply".to_string()))?
    .map_err(|e| HandshakeFailure::Io(e.to_string()))?
    .ok_or_else(|| HandshakeFailure::Io("closed before reply".to_string()))?;

    match ControlFrame::decode(&reply) {
        Ok(ControlFrame::Welcome { peer }) if peer == context.host_peer => {
            Ok(TcpLink::spawn(stream, context.max_frame_size))
        }
        Ok(ControlFrame::Welcome { peer }) => Err(HandshakeFailure::Rejected(format!(
            "host identified as {}, offer came from {}",
            peer.short(),
            context.host_peer.short()
        ))),
        Ok(ControlFrame::Reject { reason }) => Err(HandshakeFailure::Rejected(reason)),
        _ => Err(HandshakeFailure::Rejected("malformed reply".to_string())),
    }
}
