use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tictac_session_p2p::infrastructure::connection_trait::{Link, LinkEvent};
use tictac_session_p2p::{Result, SessionError};

/// One direction of the in-memory wire
#[derive(Default)]
struct Inbox {
    frames: VecDeque<LinkEvent>,
}

/// Both ends of an in-memory link
#[derive(Default)]
struct Wire {
    inboxes: [Inbox; 2],
    open: bool,
}

/// In-memory [`Link`]. Delivery is synchronous and ordered; dropping or
/// closing either end closes both and tells the other side.
pub struct MemoryLink {
    side: usize,
    wire: Arc<Mutex<Wire>>,
}

impl MemoryLink {
    pub fn pair() -> (MemoryLink, MemoryLink) {
        let wire = Arc::new(Mutex::new(Wire {
            open: true,
            ..Wire::default()
        }));

        (
            MemoryLink {
                side: 0,
                wire: wire.clone(),
            },
            MemoryLink { side: 1, wire },
        )
    }

    /// Number of frames the other end has not read yet
    pub fn in_flight(&self) -> usize {
        self.wire.lock().unwrap().inboxes[1 - self.side].frames.len()
    }
}

impl Link for MemoryLink {
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        let mut wire = self.wire.lock().unwrap();
        if !wire.open {
            return Err(SessionError::ChannelClosed);
        }

        tracing::trace!("📤 side {} -> {} bytes", self.side, frame.len());
        wire.inboxes[1 - self.side]
            .frames
            .push_back(LinkEvent::Received(frame));
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<LinkEvent> {
        let mut wire = self.wire.lock().unwrap();
        wire.inboxes[self.side].frames.drain(..).collect()
    }

    fn is_open(&self) -> bool {
        self.wire.lock().unwrap().open
    }

    fn close(&mut self) {
        let mut wire = self.wire.lock().unwrap();
        if !wire.open {
            return;
        }

        wire.open = false;
        wire.inboxes[1 - self.side]
            .frames
            .push_back(LinkEvent::Closed {
                reason: "peer closed the link".to_string(),
            });
    }
}

impl Drop for MemoryLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_notifies_other_end() {
        let (mut a, mut b) = MemoryLink::pair();
        a.send(b"one".to_vec()).unwrap();
        drop(a);

        let events = b.poll_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], LinkEvent::Closed { .. }));
        assert!(b.send(b"two".to_vec()).is_err());
    }
}
