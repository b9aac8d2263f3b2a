use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    Hidden,
    Revealed,
    Matched,
}

/// One cell of the board: its position, the pair value it carries and
/// whether it is face down, face up or already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub index: usize,
    pub value: u32,
    pub state: CardState,
}

impl Card {
    pub const fn new(index: usize, value: u32) -> Self {
        Self {
            index,
            value,
            state: CardState::Hidden,
        }
    }

    pub const fn is_hidden(self) -> bool {
        matches!(self.state, CardState::Hidden)
    }

    pub const fn is_revealed(self) -> bool {
        matches!(self.state, CardState::Revealed)
    }

    pub const fn is_matched(self) -> bool {
        matches!(self.state, CardState::Matched)
    }

    /// The value as seen from the table: face-down cards keep it secret.
    pub const fn visible_value(self) -> Option<u32> {
        match self.state {
            CardState::Hidden => None,
            CardState::Revealed | CardState::Matched => Some(self.value),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            CardState::Hidden => write!(f, "#{}:??", self.index),
            CardState::Revealed => write!(f, "#{}:{}", self.index, self.value),
            CardState::Matched => write!(f, "#{}:{}*", self.index, self.value),
        }
    }
}
