use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

/// Where a candidate address came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    /// Address of a local network interface
    Host,
    /// Operator supplied address, resolved through DNS
    Advertised,
    /// 127.0.0.1 / ::1
    Loopback,
}

impl CandidateKind {
    pub fn priority(self) -> u32 {
        match self {
            CandidateKind::Host => 100,
            CandidateKind::Advertised => 90,
            CandidateKind::Loopback => 50,
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Host => write!(f, "host"),
            CandidateKind::Advertised => write!(f, "advertised"),
            CandidateKind::Loopback => write!(f, "loopback"),
        }
    }
}

/// One address at which a party can be reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Candidate {
    pub kind: CandidateKind,
    #[schemars(with = "String")]
    pub address: SocketAddr,
    pub priority: u32,
}

impl Candidate {
    pub fn new(kind: CandidateKind, address: SocketAddr) -> Self {
        Self {
            kind,
            address,
            priority: kind.priority(),
        }
    }

    /// Sort highest priority first and keep the first candidate per address
    pub fn prioritize(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.address));
        candidates
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (priority {})", self.kind, self.address, self.priority)
    }
}
