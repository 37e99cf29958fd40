mod config;
mod connection_manager;
mod events;
mod protocol;
pub mod runtime;
mod session_channel;

pub use config::SessionConfig;
pub use connection_manager::ConnectionManager;
pub use events::{ChannelEvent, ConnectionEvent, SessionEvent, UserAction};
pub use protocol::{GameProtocol, PendingMove};
pub use runtime::{EventQueue, QueueError, SessionFsm, SessionPhase};
pub use session_channel::SessionChannel;
