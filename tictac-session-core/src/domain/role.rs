use crate::domain::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role within a session - fixed once at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Created the offer, plays X and moves first
    Host,
    /// Answered the offer, plays O
    Joiner,
}

impl Role {
    /// The mark this role places on the board
    pub fn symbol(self) -> Symbol {
        match self {
            Role::Host => Symbol::X,
            Role::Joiner => Symbol::O,
        }
    }

    /// The role on the other end of the link
    pub fn remote(self) -> Self {
        match self {
            Role::Host => Role::Joiner,
            Role::Joiner => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => write!(f, "Host"),
            Role::Joiner => write!(f, "Joiner"),
        }
    }
}
