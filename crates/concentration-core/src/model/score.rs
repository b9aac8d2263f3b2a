use crate::model::owner::Owner;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Result of a finished game from the human player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Lose => "lose",
            Outcome::Draw => "draw",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreTracker {
    pairs: [u32; 2],
    turns_taken: u32,
}

impl ScoreTracker {
    pub const fn new() -> Self {
        Self {
            pairs: [0; 2],
            turns_taken: 0,
        }
    }

    pub fn record_match(&mut self, owner: Owner) {
        self.pairs[owner.index()] += 1;
    }

    pub fn record_mismatch(&mut self) {
        self.turns_taken += 1;
    }

    pub fn pairs(&self, owner: Owner) -> u32 {
        self.pairs[owner.index()]
    }

    pub fn total_pairs(&self) -> u32 {
        self.pairs.iter().sum()
    }

    pub fn turns_taken(&self) -> u32 {
        self.turns_taken
    }

    pub fn leader(&self) -> Option<Owner> {
        match self.pairs(Owner::Player).cmp(&self.pairs(Owner::Ai)) {
            core::cmp::Ordering::Greater => Some(Owner::Player),
            core::cmp::Ordering::Less => Some(Owner::Ai),
            core::cmp::Ordering::Equal => None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self.leader() {
            Some(Owner::Player) => Outcome::Win,
            Some(Owner::Ai) => Outcome::Lose,
            None => Outcome::Draw,
        }
    }
}
