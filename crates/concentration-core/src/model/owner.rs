use core::fmt;
use serde::{Deserialize, Serialize};

/// The two sides of a concentration game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Owner {
    Player = 0,
    Ai = 1,
}

impl Owner {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn other(self) -> Owner {
        match self {
            Owner::Player => Owner::Ai,
            Owner::Ai => Owner::Player,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Owner::Player => "Player",
            Owner::Ai => "AI",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::Owner;

    #[test]
    fn other_swaps_sides() {
        assert_eq!(Owner::Player.other(), Owner::Ai);
        assert_eq!(Owner::Ai.other(), Owner::Player);
    }

    #[test]
    fn index_follows_discriminant() {
        assert_eq!(Owner::Player.index(), 0);
        assert_eq!(Owner::Ai.index(), 1);
    }

    #[test]
    fn display_and_serde_labels() {
        assert_eq!(Owner::Ai.to_string(), "AI");
        assert_eq!(serde_json::to_string(&Owner::Player).unwrap(), "\"player\"");
    }
}
