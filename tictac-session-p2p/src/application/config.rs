use crate::infrastructure::gatherer::CandidateGatherer;
use crate::infrastructure::message::DEFAULT_MAX_FRAME_SIZE;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Configuration for one peer session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address the host listener binds to
    pub bind_addr: SocketAddr,

    /// Extra `host[:port]` names offered as candidates, resolved through DNS
    pub advertised: Vec<String>,

    /// Offer a loopback candidate when bound to the unspecified address
    pub include_loopback: bool,

    /// Discovery is done once no candidate arrived for this long
    pub quiescence_window: Duration,

    /// Discovery fails if it has not settled by then
    pub gather_timeout: Duration,

    /// How long a published offer waits for its answer
    pub answer_timeout: Duration,

    /// Per-candidate TCP dial limit, and the host's limit once the answer is in
    pub connect_timeout: Duration,

    /// How long the host waits for a hello after accepting a connection
    pub hello_timeout: Duration,

    pub max_frame_size: usize,

    /// Capacity of the session event queue
    pub event_queue_size: usize,

    /// Desyncs before the status line warns about connection quality
    pub desync_warning_threshold: u32,

    /// Limit for a signaling `retrieve`
    pub signaling_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            advertised: Vec::new(),
            include_loopback: true,
            quiescence_window: Duration::from_millis(250),
            gather_timeout: Duration::from_secs(5),
            answer_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(15),
            hello_timeout: Duration::from_secs(5),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            event_queue_size: 256,
            desync_warning_threshold: 3,
            signaling_timeout: Duration::from_secs(300),
        }
    }
}

impl SessionConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Loopback only with short windows, for tests and local demos
    pub fn local() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            quiescence_window: Duration::from_millis(50),
            gather_timeout: Duration::from_secs(2),
            answer_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
            hello_timeout: Duration::from_secs(2),
            signaling_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_advertised(mut self, name: impl Into<String>) -> Self {
        self.advertised.push(name.into());
        self
    }

    pub fn with_loopback(mut self, include: bool) -> Self {
        self.include_loopback = include;
        self
    }

    pub fn with_quiescence_window(mut self, window: Duration) -> Self {
        self.quiescence_window = window;
        self
    }

    pub fn with_gather_timeout(mut self, timeout: Duration) -> Self {
        self.gather_timeout = timeout;
        self
    }

    pub fn with_answer_timeout(mut self, timeout: Duration) -> Self {
        self.answer_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_hello_timeout(mut self, timeout: Duration) -> Self {
        self.hello_timeout = timeout;
        self
    }

    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    pub fn with_event_queue_size(mut self, size: usize) -> Self {
        self.event_queue_size = size;
        self
    }

    pub fn with_desync_warning_threshold(mut self, threshold: u32) -> Self {
        self.desync_warning_threshold = threshold;
        self
    }

    pub fn with_signaling_timeout(mut self, timeout: Duration) -> Self {
        self.signaling_timeout = timeout;
        self
    }

    /// Candidate discovery configured from these settings
    pub fn gatherer(&self) -> CandidateGatherer {
        CandidateGatherer::new(self.bind_addr.ip())
            .with_advertised(self.advertised.clone())
            .with_loopback(self.include_loopback)
            .with_quiescence_window(self.quiescence_window)
            .with_gather_timeout(self.gather_timeout)
    }
}
