use crate::error::GameError;
use crate::model::card::{Card, CardState};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Fixed-shape grid of cards. Positions are row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cards: Vec<Card>,
}

impl Board {
    /// Deals `rows * cols / 2` pair values, each at two positions, in a
    /// uniformly shuffled layout driven by `rng`.
    pub fn initialize<R: rand::Rng + ?Sized>(
        rows: usize,
        cols: usize,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let len = validate_dimensions(rows, cols)?;
        let pairs = (len / 2) as u32;
        let mut values: Vec<u32> = (0..pairs).chain(0..pairs).collect();
        values.shuffle(rng);
        Ok(Self::from_layout(rows, cols, values))
    }

    pub fn initialize_with_seed(rows: usize, cols: usize, seed: u64) -> Result<Self, GameError> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::initialize(rows, cols, &mut rng)
    }

    /// Builds a board from an explicit row-major layout.
    pub fn from_values(rows: usize, cols: usize, values: Vec<u32>) -> Result<Self, GameError> {
        let len = validate_dimensions(rows, cols)?;
        if values.len() != len {
            return Err(GameError::InvalidDimensions { rows, cols });
        }

        let mut counts: HashMap<u32, usize> = HashMap::new();
        for value in &values {
            *counts.entry(*value).or_default() += 1;
        }
        // Report the first offending value in layout order so the error is stable.
        if let Some((value, count)) = values
            .iter()
            .map(|value| (*value, counts[value]))
            .find(|(_, count)| *count != 2)
        {
            return Err(GameError::InvalidLayout { value, count });
        }

        Ok(Self::from_layout(rows, cols, values))
    }

    fn from_layout(rows: usize, cols: usize, values: Vec<u32>) -> Self {
        let cards = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| Card::new(index, value))
            .collect();
        Self { rows, cols, cards }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, index: usize) -> Result<Card, GameError> {
        self.cards
            .get(index)
            .copied()
            .ok_or(GameError::InvalidIndex {
                index,
                len: self.cards.len(),
            })
    }

    pub fn is_hidden(&self, index: usize) -> bool {
        self.cards.get(index).is_some_and(|card| card.is_hidden())
    }

    pub fn hidden_indices(&self) -> Vec<usize> {
        self.cards
            .iter()
            .filter(|card| card.is_hidden())
            .map(|card| card.index)
            .collect()
    }

    pub fn hidden_count(&self) -> usize {
        self.cards.iter().filter(|card| card.is_hidden()).count()
    }

    pub fn revealed_count(&self) -> usize {
        self.cards.iter().filter(|card| card.is_revealed()).count()
    }

    pub fn reveal(&mut self, index: usize) -> Result<Card, GameError> {
        let card = self.card(index)?;
        if !card.is_hidden() {
            return Err(GameError::illegal("card is already face up"));
        }
        if self.revealed_count() >= 2 {
            return Err(GameError::illegal("two cards are already face up"));
        }
        self.cards[index].state = CardState::Revealed;
        Ok(self.cards[index])
    }

    pub fn mark_matched(&mut self, a: usize, b: usize) -> Result<(), GameError> {
        self.transition_pair(a, b, CardState::Matched)
    }

    pub fn reset_pair(&mut self, a: usize, b: usize) -> Result<(), GameError> {
        self.transition_pair(a, b, CardState::Hidden)
    }

    fn transition_pair(&mut self, a: usize, b: usize, next: CardState) -> Result<(), GameError> {
        let first = self.card(a)?;
        let second = self.card(b)?;
        if a == b {
            return Err(GameError::illegal("a pair needs two distinct cards"));
        }
        if !first.is_revealed() || !second.is_revealed() {
            return Err(GameError::illegal("both cards must be face up"));
        }
        self.cards[a].state = next;
        self.cards[b].state = next;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.cards.iter().all(|card| card.is_matched())
    }
}

fn validate_dimensions(rows: usize, cols: usize) -> Result<usize, GameError> {
    let len = rows
        .checked_mul(cols)
        .ok_or(GameError::InvalidDimensions { rows, cols })?;
    if len == 0 || len % 2 != 0 {
        return Err(GameError::InvalidDimensions { rows, cols });
    }
    Ok(len)
}
