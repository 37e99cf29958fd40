use crate::application::ChannelEvent;
use crate::infrastructure::connection_trait::{Link, LinkEvent};
use crate::infrastructure::error::{Result, SessionError};
use crate::infrastructure::message::ProtocolMessage;
use std::fmt;

/// Reliable, ordered message channel over one negotiated link.
///
/// Not `Clone`: whoever owns the channel is its only reader.
pub struct SessionChannel {
    link: Box<dyn Link>,
    closed: bool,
}

impl SessionChannel {
    pub fn new(link: Box<dyn Link>) -> Self {
        Self {
            link,
            closed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed && self.link.is_open()
    }

    /// Encode and enqueue one message. Does not wait for delivery.
    pub fn send(&mut self, message: &ProtocolMessage) -> Result<()> {
        if !self.is_open() {
            return Err(SessionError::ChannelClosed);
        }

        let frame = message.encode()?;
        self.link.send(frame)?;
        tracing::debug!("📤 Sent {:?}", message);
        Ok(())
    }

    /// Drain received messages in order.
    ///
    /// Frames that do not decode are dropped with a warning. Nothing is
    /// reported after `Closed`.
    pub fn poll(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        if self.closed {
            return events;
        }

        for event in self.link.poll_events() {
            match event {
                LinkEvent::Received(frame) => match ProtocolMessage::decode(&frame) {
                    Ok(message) => {
                        tracing::debug!("📥 Received {:?}", message);
                        events.push(ChannelEvent::Message(message));
                    }
                    Err(e) => {
                        tracing::warn!(
                            "⚠️  Dropping unrecognized frame ({} bytes): {}",
                            frame.len(),
                            e
                        );
                    }
                },
                LinkEvent::Closed { reason } => {
                    self.closed = true;
                    events.push(ChannelEvent::Closed { reason });
                    break;
                }
            }
        }

        events
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.link.close();
    }
}

impl fmt::Debug for SessionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionChannel")
            .field("open", &self.is_open())
            .finish()
    }
}
