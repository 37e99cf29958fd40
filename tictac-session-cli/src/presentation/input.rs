use tictac_session_p2p::UserAction;

pub const HELP: &str = "Commands: 0-8 place a mark, r restart, q leave";

/// Map one line of terminal input to an action
pub fn parse_command(line: &str) -> Option<UserAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "restart" => Some(UserAction::Restart),
        "q" | "quit" | "leave" => Some(UserAction::Leave),
        other => other.parse::<usize>().ok().map(UserAction::Play),
    }
}
