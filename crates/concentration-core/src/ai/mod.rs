//! The computer opponent.
//!
//! - `recall`: bounded, first-seen-first-forgotten memory of face-up cards.
//! - `policy`: move selection on top of that memory.

pub mod policy;
pub mod recall;

pub use policy::{
    DecisionTally, Move, MoveReason, Policy, PolicyContext, RandomPolicy, RecallPolicy,
};
pub use recall::RecallMemory;
