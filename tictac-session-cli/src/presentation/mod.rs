pub mod board_view;
pub mod input;

pub use board_view::{BoardView, SessionView};
pub use input::{parse_command, HELP};
