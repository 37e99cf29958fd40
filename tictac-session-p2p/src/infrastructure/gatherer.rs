use crate::domain::{Candidate, CandidateKind, FailureReason};
use crate::infrastructure::error::{Result, SessionError};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Discovers the addresses at which a local listener can be reached.
///
/// Every source runs as its own task and streams candidates into one channel.
/// Discovery ends when all sources are done, or when nothing new arrived for
/// `quiescence_window` after the first candidate. Hitting `gather_timeout`
/// first is a failure.
#[derive(Debug, Clone)]
pub struct CandidateGatherer {
    bind_ip: IpAddr,
    advertised: Vec<String>,
    include_loopback: bool,
    quiescence_window: Duration,
    gather_timeout: Duration,
}

impl CandidateGatherer {
    pub fn new(bind_ip: IpAddr) -> Self {
        Self {
            bind_ip,
            advertised: Vec::new(),
            include_loopback: true,
            quiescence_window: Duration::from_millis(250),
            gather_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_advertised(mut self, advertised: Vec<String>) -> Self {
        self.advertised = advertised;
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

    /// Run every source for a listener on `port`
    pub async fn gather(&self, port: u16) -> Result<Vec<Candidate>> {
        let (tx, rx) = mpsc::channel(32);
        let mut sources = JoinSet::new();

        if self.bind_ip.is_unspecified() {
            sources.spawn(interface_source(port, tx.clone()));
            if self.include_loopback {
                let loopback = if self.bind_ip.is_ipv6() {
                    IpAddr::V6(Ipv6Addr::LOCALHOST)
                } else {
                    IpAddr::V4(Ipv4Addr::LOCALHOST)
                };
                sources.spawn(fixed_source(SocketAddr::new(loopback, port), tx.clone()));
            }
        } else {
            sources.spawn(fixed_source(SocketAddr::new(self.bind_ip, port), tx.clone()));
        }

        for name in &self.advertised {
            sources.spawn(advertised_source(name.clone(), port, tx.clone()));
        }
        drop(tx);

        tracing::debug!("🔍 Gathering candidates from {} sources", sources.len());
        let result = collect_candidates(rx, self.quiescence_window, self.gather_timeout).await;
        sources.abort_all();

        let candidates = Candidate::prioritize(result?);
        for candidate in &candidates {
            tracing::info!("  Candidate: {}", candidate);
        }
        Ok(candidates)
    }
}

/// Drain a candidate stream until it closes or goes quiet.
///
/// Zero candidates is a negotiation error. Running into the deadline while
/// candidates are still trickling in is `Unreachable`.
pub async fn collect_candidates(
    mut rx: mpsc::Receiver<Candidate>,
    quiescence_window: Duration,
    gather_timeout: Duration,
) -> Result<Vec<Candidate>> {
    let deadline = Instant::now() + gather_timeout;
    let mut found: Vec<Candidate> = Vec::new();

    loop {
        let quiet_at = (!found.is_empty()).then(|| Instant::now() + quiescence_window);
        let (wake_at, waiting_for_quiet) = match quiet_at {
            Some(quiet_at) if quiet_at <= deadline => (quiet_at, true),
            _ => (deadline, false),
        };

        match tokio::time::timeout_at(wake_at, rx.recv()).await {
            Ok(Some(candidate)) => {
                tracing::trace!("Candidate found: {}", candidate);
                found.push(candidate);
            }
            Ok(None) => break,
            Err(_) if waiting_for_quiet => {
                tracing::debug!("Discovery quiesced with {} candidates", found.len());
                break;
            }
            Err(_) => {
                return Err(SessionError::link(
                    FailureReason::Unreachable,
                    format!(
                        "candidate discovery did not settle within {:?}",
                        gather_timeout
                    ),
                ));
            }
        }
    }

    if found.is_empty() {
        return Err(SessionError::Negotiation(
            "no local candidates discovered".to_string(),
        ));
    }

    Ok(found)
}

async fn fixed_source(address: SocketAddr, tx: mpsc::Sender<Candidate>) {
    let kind = if address.ip().is_loopback() {
        CandidateKind::Loopback
    } else {
        CandidateKind::Host
    };
    let _ = tx.send(Candidate::new(kind, address)).await;
}

async fn interface_source(port: u16, tx: mpsc::Sender<Candidate>) {
    match local_interface_ip().await {
        Ok(ip) if !ip.is_loopback() && !ip.is_unspecified() => {
            let _ = tx
                .send(Candidate::new(CandidateKind::Host, SocketAddr::new(ip, port)))
                .await;
        }
        Ok(ip) => tracing::debug!("Interface probe returned {}, skipping", ip),
        Err(e) => tracing::debug!("Interface probe failed: {}", e),
    }
}

/// Address of the interface holding the default route.
/// Connecting a UDP socket sends nothing.
async fn local_interface_ip() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).await?;
    Ok(socket.local_addr()?.ip())
}

async fn advertised_source(name: String, port: u16, tx: mpsc::Sender<Candidate>) {
    let resolved = if let Ok(address) = name.parse::<SocketAddr>() {
        Ok(vec![address])
    } else if name.contains(':') {
        tokio::net::lookup_host(name.as_str())
            .await
            .map(|addrs| addrs.collect::<Vec<_>>())
    } else {
        tokio::net::lookup_host((name.as_str(), port))
            .await
            .map(|addrs| addrs.collect::<Vec<_>>())
    };

    match resolved {
        Ok(addresses) => {
            for address in addresses {
                if tx
                    .send(Candidate::new(CandidateKind::Advertised, address))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
        Err(e) => tracing::warn!("⚠️  Could not resolve advertised address {}: {}", name, e),
    }
}
