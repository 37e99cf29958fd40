pub mod infrastructure;
pub mod presentation;

pub use infrastructure::{CliError, LogConfig, Result};
pub use presentation::{parse_command, BoardView, SessionView};
