use crate::ai::recall::RecallMemory;
use crate::model::board::Board;
use core::fmt;
use rand::RngCore;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

/// Why a move was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveReason {
    KnownPair,
    KnownSingle,
    Random,
}

impl fmt::Display for MoveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MoveReason::KnownPair => "known_pair",
            MoveReason::KnownSingle => "known_single",
            MoveReason::Random => "random",
        };
        f.write_str(label)
    }
}

/// Two positions to flip, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub first: usize,
    pub second: usize,
    pub reason: MoveReason,
}

/// Context provided to policies for decision-making
pub struct PolicyContext<'a> {
    pub board: &'a Board,
    pub memory: &'a RecallMemory,
}

/// Chooses the next two flips for whoever owns the turn.
pub trait Policy {
    /// Returns `None` when fewer than two cards are face down.
    fn choose_move(&self, ctx: &PolicyContext<'_>, rng: &mut dyn RngCore) -> Option<Move>;
}

/// Plays a remembered pair, else a remembered card plus a blind guess,
/// else two blind guesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecallPolicy;

impl RecallPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl Policy for RecallPolicy {
    fn choose_move(&self, ctx: &PolicyContext<'_>, rng: &mut dyn RngCore) -> Option<Move> {
        let hidden = ctx.board.hidden_indices();
        if hidden.len() < 2 {
            return None;
        }

        let chosen = if let Some((first, second)) = ctx.memory.known_pair(ctx.board) {
            Move {
                first,
                second,
                reason: MoveReason::KnownPair,
            }
        } else if let Some(first) = ctx.memory.known_single(ctx.board) {
            let second = pick_other(&hidden, first, rng)?;
            Move {
                first,
                second,
                reason: MoveReason::KnownSingle,
            }
        } else {
            random_move(&hidden, rng)?
        };

        log_decision(ctx, &chosen, hidden.len());
        Some(chosen)
    }
}

/// Ignores memory entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl Policy for RandomPolicy {
    fn choose_move(&self, ctx: &PolicyContext<'_>, rng: &mut dyn RngCore) -> Option<Move> {
        let hidden = ctx.board.hidden_indices();
        random_move(&hidden, rng)
    }
}

fn random_move(hidden: &[usize], rng: &mut dyn RngCore) -> Option<Move> {
    let first = *hidden.choose(rng)?;
    let second = pick_other(hidden, first, rng)?;
    Some(Move {
        first,
        second,
        reason: MoveReason::Random,
    })
}

fn pick_other(hidden: &[usize], exclude: usize, rng: &mut dyn RngCore) -> Option<usize> {
    let pool: Vec<usize> = hidden
        .iter()
        .copied()
        .filter(|index| *index != exclude)
        .collect();
    pool.choose(rng).copied()
}

/// Counts of decisions by reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionTally {
    pub known_pair: u32,
    pub known_single: u32,
    pub random: u32,
}

impl DecisionTally {
    pub fn record(&mut self, reason: MoveReason) {
        match reason {
            MoveReason::KnownPair => self.known_pair += 1,
            MoveReason::KnownSingle => self.known_single += 1,
            MoveReason::Random => self.random += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.known_pair + self.known_single + self.random
    }

    pub fn absorb(&mut self, other: &DecisionTally) {
        self.known_pair += other.known_pair;
        self.known_single += other.known_single;
        self.random += other.random;
    }
}

fn log_decision(ctx: &PolicyContext<'_>, chosen: &Move, hidden: usize) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    event!(
        target: "concentration_core::policy",
        Level::DEBUG,
        first = chosen.first,
        second = chosen.second,
        reason = %chosen.reason,
        hidden,
        remembered = ctx.memory.len(),
        capacity = ctx.memory.capacity(),
    );
}
