use super::engine::{Phase, TurnEngine};
use crate::model::board::Board;
use crate::model::card::CardState;
use crate::model::owner::Owner;
use crate::model::score::ScoreTracker;
use serde::{Deserialize, Serialize};

/// A card as a renderer may show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub index: usize,
    pub value: Option<u32>,
    pub state: CardState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PairCounts {
    pub player: u32,
    pub ai: u32,
}

/// Read-only view of a session. Face-down values are never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub cards: Vec<CardView>,
    pub pairs: PairCounts,
    pub turns_taken: u32,
    pub current_owner: Owner,
    pub phase: Phase,
}

impl SessionSnapshot {
    pub(crate) fn from_parts(board: &Board, scores: &ScoreTracker, engine: &TurnEngine) -> Self {
        let cards = board
            .cards()
            .iter()
            .map(|card| CardView {
                index: card.index,
                value: card.visible_value(),
                state: card.state,
            })
            .collect();

        Self {
            rows: board.rows(),
            cols: board.cols(),
            cards,
            pairs: PairCounts {
                player: scores.pairs(Owner::Player),
                ai: scores.pairs(Owner::Ai),
            },
            turns_taken: scores.turns_taken(),
            current_owner: engine.current_owner(),
            phase: engine.phase(),
        }
    }

    pub fn revealed(&self) -> impl Iterator<Item = &CardView> + '_ {
        self.cards
            .iter()
            .filter(|card| card.state == CardState::Revealed)
    }

    pub fn hidden_count(&self) -> usize {
        self.cards
            .iter()
            .filter(|card| card.state == CardState::Hidden)
            .count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
