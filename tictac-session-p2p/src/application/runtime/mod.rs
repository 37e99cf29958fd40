mod event_queue;
mod session_fsm;

pub use event_queue::{EventQueue, QueueError};
pub use session_fsm::{SessionFsm, SessionPhase};
