mod commands;
mod events;
mod state_machine;

pub use commands::GameCommand;
pub use events::GameEvent;
pub use state_machine::GameStateMachine;
