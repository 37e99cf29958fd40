use crate::infrastructure::connection_trait::{Link, LinkEvent};
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::message::{read_frame, write_frame};
use std::io;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Infrastructure adapter: framed TCP stream driven by a reader and a writer task.
///
/// Outbound frames go through one FIFO queue to a single writer, so frames are
/// delivered in send order. Inbound frames are buffered until `poll_events`.
pub struct TcpLink {
    peer_addr: Option<SocketAddr>,
    max_frame_size: usize,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: mpsc::UnboundedReceiver<LinkEvent>,
    open: bool,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl TcpLink {
    /// Take ownership of a connected stream and start its I/O tasks
    pub fn spawn(stream: TcpStream, max_frame_size: usize) -> Self {
        let peer_addr = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not set TCP_NODELAY: {}", e);
        }

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let span = tracing::debug_span!("tcp_link", peer = ?peer_addr);
        let reader = tokio::spawn(
            run_reader(read_half, max_frame_size, inbound_tx.clone()).instrument(span.clone()),
        );
        let writer = tokio::spawn(run_writer(write_half, outbound_rx, inbound_tx).instrument(span));

        tracing::debug!("🔗 Link up with {:?}", peer_addr);

        Self {
            peer_addr,
            max_frame_size,
            outbound: outbound_tx,
            inbound: inbound_rx,
            open: true,
            reader,
            writer,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

impl Link for TcpLink {
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        if !self.open {
            return Err(SessionError::ChannelClosed);
        }

        if frame.len() > self.max_frame_size {
            return Err(SessionError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame of {} bytes exceeds limit of {}",
                    frame.len(),
                    self.max_frame_size
                ),
            )));
        }

        tracing::trace!("📤 {} bytes queued", frame.len());
        self.outbound
            .send(frame)
            .map_err(|_| SessionError::ChannelClosed)
    }

    fn poll_events(&mut self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        if !self.open {
            return events;
        }

        while let Ok(event) = self.inbound.try_recv() {
            if let LinkEvent::Closed { reason } = &event {
                tracing::info!("🔌 Link to {:?} closed: {}", self.peer_addr, reason);
                self.open = false;
                events.push(event);
                break;
            }
            events.push(event);
        }

        events
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            tracing::debug!("Closing link to {:?}", self.peer_addr);
        }
        self.open = false;
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn run_reader(
    mut read_half: OwnedReadHalf,
    max_frame_size: usize,
    inbound: mpsc::UnboundedSender<LinkEvent>,
) {
    loop {
        match read_frame(&mut read_half, max_frame_size).await {
            Ok(Some(frame)) => {
                tracing::trace!("📥 {} bytes received", frame.len());
                if inbound.send(LinkEvent::Received(frame)).is_err() {
                    return;
                }
            }
            Ok(None) => {
                let _ = inbound.send(LinkEvent::Closed {
                    reason: "peer closed the connection".to_string(),
                });
                return;
            }
            Err(e) => {
                let _ = inbound.send(LinkEvent::Closed {
                    reason: e.to_string(),
                });
                return;
            }
        }
    }
}

async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    inbound: mpsc::UnboundedSender<LinkEvent>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_frame(&mut write_half, &frame).await {
            let _ = inbound.send(LinkEvent::Closed {
                reason: format!("write failed: {}", e),
            });
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpLink, TcpLink) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let client = TcpLink::spawn(client.unwrap(), 1024);
        let server = TcpLink::spawn(accepted.unwrap().0, 1024);
        (client, server)
    }

    async fn next_events(link: &mut TcpLink) -> Vec<LinkEvent> {
        for _ in 0..100 {
            let events = link.poll_events();
            if !events.is_empty() {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Vec::new()
    }

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let (mut client, mut server) = connected_pair().await;

        for i in 0..5u8 {
            client.send(vec![i]).unwrap();
        }

        let mut received = Vec::new();
        while received.len() < 5 {
            let events = next_events(&mut server).await;
            assert!(!events.is_empty(), "timed out waiting for frames");
            received.extend(events);
        }

        let expected: Vec<_> = (0..5u8).map(|i| LinkEvent::Received(vec![i])).collect();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_drop_is_seen_as_closed() {
        let (client, mut server) = connected_pair().await;
        drop(client);

        let events = next_events(&mut server).await;
        assert!(matches!(events.last(), Some(LinkEvent::Closed { .. })));
        assert!(!server.is_open());
        assert!(matches!(
            server.send(vec![1]),
            Err(SessionError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_oversized_send_rejected() {
        let (mut client, _server) = connected_pair().await;
        assert!(matches!(
            client.send(vec![0u8; 2048]),
            Err(SessionError::Io(_))
        ));
        assert!(client.is_open());
    }
}
