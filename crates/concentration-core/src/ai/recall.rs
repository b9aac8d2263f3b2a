//! Bounded recall of face-up cards.
//!
//! Positions are remembered in the order they were first seen and the
//! oldest sighting is dropped once `capacity` is exceeded. Re-observing a
//! tracked position does not refresh it.

use crate::model::board::Board;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallMemory {
    recall: HashMap<usize, u32>,
    order: VecDeque<usize>,
    capacity: usize,
}

impl RecallMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            recall: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.recall.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recall.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.recall.contains_key(&index)
    }

    pub fn recall(&self, index: usize) -> Option<u32> {
        self.recall.get(&index).copied()
    }

    /// Tracked positions, oldest sighting first.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    pub fn observe(&mut self, index: usize, value: u32) {
        if self.capacity == 0 {
            return;
        }
        if self.recall.insert(index, value).is_none() {
            self.order.push_back(index);
        }
        self.evict_if_needed();
    }

    pub fn forget(&mut self, index: usize) {
        if self.recall.remove(&index).is_some() {
            self.order.retain(|tracked| *tracked != index);
        }
    }

    pub fn reset(&mut self) {
        self.recall.clear();
        self.order.clear();
    }

    /// First two tracked face-down positions that share a value.
    pub fn known_pair(&self, board: &Board) -> Option<(usize, usize)> {
        let hidden: Vec<(usize, u32)> = self.hidden_entries(board).collect();
        hidden.iter().enumerate().find_map(|(offset, &(first, value))| {
            hidden[offset + 1..]
                .iter()
                .find(|(_, other)| *other == value)
                .map(|&(second, _)| (first, second))
        })
    }

    /// First tracked face-down position whose twin is not tracked.
    pub fn known_single(&self, board: &Board) -> Option<usize> {
        self.hidden_entries(board)
            .find(|&(index, value)| {
                !self
                    .order
                    .iter()
                    .any(|other| *other != index && self.recall.get(other) == Some(&value))
            })
            .map(|(index, _)| index)
    }

    fn hidden_entries<'a>(&'a self, board: &'a Board) -> impl Iterator<Item = (usize, u32)> + 'a {
        self.order
            .iter()
            .copied()
            .filter(|index| board.is_hidden(*index))
            .filter_map(|index| self.recall.get(&index).map(|value| (index, *value)))
    }

    fn evict_if_needed(&mut self) {
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.recall.remove(&oldest);
            }
        }
    }
}
