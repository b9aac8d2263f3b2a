use crate::ai::policy::{DecisionTally, Policy, PolicyContext, RecallPolicy};
use crate::ai::recall::RecallMemory;
use crate::error::GameError;
use crate::model::board::Board;
use crate::model::card::Card;
use crate::model::owner::Owner;
use crate::model::score::ScoreTracker;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingFirstFlip,
    AwaitingSecondFlip,
    Resolving,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// First card of a pair is face up.
    Revealed { owner: Owner, card: Card },
    /// Both cards carried the same value and are taken; `finished` is set
    /// when that emptied the board.
    Matched {
        owner: Owner,
        first: Card,
        second: Card,
        finished: bool,
    },
    /// Both cards stay face up until the host settles them.
    Mismatched {
        owner: Owner,
        first: Card,
        second: Card,
    },
}

/// The pieces a turn mutates, borrowed from the session for one call.
pub struct Table<'a> {
    pub board: &'a mut Board,
    pub scores: &'a mut ScoreTracker,
    pub memory: &'a mut RecallMemory,
}

/// Turn and flip state machine shared by both owners.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    current_owner: Owner,
    phase: Phase,
    pending_first: Option<Card>,
    pending_second: Option<Card>,
    policy: RecallPolicy,
    decisions: DecisionTally,
}

impl TurnEngine {
    pub fn new(starting_owner: Owner) -> Self {
        Self {
            current_owner: starting_owner,
            phase: Phase::AwaitingFirstFlip,
            pending_first: None,
            pending_second: None,
            policy: RecallPolicy::new(),
            decisions: DecisionTally::default(),
        }
    }

    pub fn current_owner(&self) -> Owner {
        self.current_owner
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn decisions(&self) -> &DecisionTally {
        &self.decisions
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished)
    }

    /// True when the computer owns a fresh turn and should be asked to move.
    pub fn ai_to_move(&self) -> bool {
        matches!(self.phase, Phase::AwaitingFirstFlip) && self.current_owner == Owner::Ai
    }

    pub fn flip(
        &mut self,
        table: &mut Table<'_>,
        owner: Owner,
        index: usize,
    ) -> Result<FlipOutcome, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if owner != self.current_owner {
            return Err(GameError::NotYourTurn {
                expected: self.current_owner,
                actual: owner,
            });
        }

        match self.phase {
            Phase::AwaitingFirstFlip => {
                let card = table.board.reveal(index)?;
                table.memory.observe(card.index, card.value);
                self.pending_first = Some(card);
                self.phase = Phase::AwaitingSecondFlip;
                event!(
                    target: "concentration_core::engine",
                    Level::TRACE,
                    owner = %owner,
                    index,
                    value = card.value,
                    "first flip"
                );
                Ok(FlipOutcome::Revealed { owner, card })
            }
            Phase::AwaitingSecondFlip => {
                let first = self
                    .pending_first
                    .ok_or(GameError::illegal("no first card is face up"))?;
                if first.index == index {
                    return Err(GameError::illegal("card is already face up"));
                }
                let second = table.board.reveal(index)?;
                table.memory.observe(second.index, second.value);
                self.pending_second = Some(second);
                self.phase = Phase::Resolving;

                if first.value == second.value {
                    self.resolve_match(table, first, second)
                } else {
                    event!(
                        target: "concentration_core::engine",
                        Level::DEBUG,
                        owner = %owner,
                        first = first.index,
                        second = second.index,
                        "mismatch awaiting settle"
                    );
                    Ok(FlipOutcome::Mismatched {
                        owner,
                        first,
                        second,
                    })
                }
            }
            Phase::Resolving => Err(GameError::illegal(
                "a mismatched pair is still waiting to be settled",
            )),
            Phase::Finished => Err(GameError::GameOver),
        }
    }

    fn resolve_match(
        &mut self,
        table: &mut Table<'_>,
        first: Card,
        second: Card,
    ) -> Result<FlipOutcome, GameError> {
        table.board.mark_matched(first.index, second.index)?;
        table.memory.forget(first.index);
        table.memory.forget(second.index);
        table.scores.record_match(self.current_owner);
        self.pending_first = None;
        self.pending_second = None;

        let finished = table.board.is_complete();
        self.phase = if finished {
            Phase::Finished
        } else {
            Phase::AwaitingFirstFlip
        };

        event!(
            target: "concentration_core::engine",
            Level::DEBUG,
            owner = %self.current_owner,
            first = first.index,
            second = second.index,
            value = first.value,
            pairs = table.scores.pairs(self.current_owner),
            finished,
            "pair matched"
        );

        Ok(FlipOutcome::Matched {
            owner: self.current_owner,
            first: table.board.card(first.index)?,
            second: table.board.card(second.index)?,
            finished,
        })
    }

    /// Turns a settled mismatch face down again and hands the turn over.
    pub fn resolve_mismatch(&mut self, table: &mut Table<'_>) -> Result<Owner, GameError> {
        match self.phase {
            Phase::Finished => return Err(GameError::GameOver),
            Phase::Resolving => {}
            Phase::AwaitingFirstFlip | Phase::AwaitingSecondFlip => {
                return Err(GameError::illegal("no mismatched pair to settle"));
            }
        }
        let (Some(first), Some(second)) = (self.pending_first, self.pending_second) else {
            return Err(GameError::illegal("no mismatched pair to settle"));
        };

        table.board.reset_pair(first.index, second.index)?;
        table.scores.record_mismatch();
        self.pending_first = None;
        self.pending_second = None;
        self.current_owner = self.current_owner.other();
        self.phase = Phase::AwaitingFirstFlip;

        event!(
            target: "concentration_core::engine",
            Level::DEBUG,
            next_owner = %self.current_owner,
            turns_taken = table.scores.turns_taken(),
            "turn passed"
        );

        Ok(self.current_owner)
    }

    /// Lets the computer move until it mismatches or the board is cleared.
    ///
    /// Each move goes through [`TurnEngine::flip`] exactly like a human's.
    pub fn play_ai_turn(
        &mut self,
        table: &mut Table<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<FlipOutcome>, GameError> {
        let mut outcomes = Vec::new();
        while self.ai_to_move() {
            if table.board.hidden_count() < 2 {
                self.phase = Phase::Finished;
                break;
            }

            let chosen = {
                let ctx = PolicyContext {
                    board: &*table.board,
                    memory: &*table.memory,
                };
                self.policy.choose_move(&ctx, rng)
            };
            let Some(chosen) = chosen else {
                self.phase = Phase::Finished;
                break;
            };

            self.decisions.record(chosen.reason);
            outcomes.push(self.flip(table, Owner::Ai, chosen.first)?);
            outcomes.push(self.flip(table, Owner::Ai, chosen.second)?);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::{FlipOutcome, Phase, Table, TurnEngine};
    use crate::ai::recall::RecallMemory;
    use crate::error::GameError;
    use crate::model::board::Board;
    use crate::model::owner::Owner;
    use crate::model::score::ScoreTracker;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        board: Board,
        scores: ScoreTracker,
        memory: RecallMemory,
    }

    impl Fixture {
        fn new(rows: usize, cols: usize, values: Vec<u32>) -> Self {
            Self {
                board: Board::from_values(rows, cols, values).unwrap(),
                scores: ScoreTracker::new(),
                memory: RecallMemory::new(16),
            }
        }

        fn table(&mut self) -> Table<'_> {
            Table {
                board: &mut self.board,
                scores: &mut self.scores,
                memory: &mut self.memory,
            }
        }
    }

    #[test]
    fn match_keeps_the_turn() {
        let mut fx = Fixture::new(2, 2, vec![0, 1, 0, 1]);
        let mut engine = TurnEngine::new(Owner::Player);
        engine.flip(&mut fx.table(), Owner::Player, 0).unwrap();
        assert_eq!(engine.phase(), Phase::AwaitingSecondFlip);
        let outcome = engine.flip(&mut fx.table(), Owner::Player, 2).unwrap();
        assert!(matches!(
            outcome,
            FlipOutcome::Matched {
                owner: Owner::Player,
                finished: false,
                ..
            }
        ));
        assert_eq!(engine.phase(), Phase::AwaitingFirstFlip);
        assert_eq!(engine.current_owner(), Owner::Player);
        assert_eq!(fx.scores.pairs(Owner::Player), 1);
        assert!(!fx.memory.contains(0));
        assert!(!fx.memory.contains(2));
    }

    #[test]
    fn mismatch_waits_for_settle_then_switches_owner() {
        let mut fx = Fixture::new(2, 2, vec![0, 1, 0, 1]);
        let mut engine = TurnEngine::new(Owner::Player);
        engine.flip(&mut fx.table(), Owner::Player, 0).unwrap();
        let outcome = engine.flip(&mut fx.table(), Owner::Player, 1).unwrap();
        assert!(matches!(outcome, FlipOutcome::Mismatched { .. }));
        assert_eq!(engine.phase(), Phase::Resolving);
        assert_eq!(fx.board.revealed_count(), 2);
        assert!(matches!(
            engine.flip(&mut fx.table(), Owner::Player, 2),
            Err(GameError::IllegalState { .. })
        ));

        let next = engine.resolve_mismatch(&mut fx.table()).unwrap();
        assert_eq!(next, Owner::Ai);
        assert_eq!(engine.phase(), Phase::AwaitingFirstFlip);
        assert_eq!(fx.scores.turns_taken(), 1);
        assert_eq!(fx.board.revealed_count(), 0);
        assert_eq!(fx.memory.len(), 2);
    }

    #[test]
    fn rejects_out_of_turn_and_invalid_flips_without_changing_state() {
        let mut fx = Fixture::new(2, 2, vec![0, 1, 0, 1]);
        let mut engine = TurnEngine::new(Owner::Player);
        assert!(matches!(
            engine.flip(&mut fx.table(), Owner::Ai, 0),
            Err(GameError::NotYourTurn {
                expected: Owner::Player,
                actual: Owner::Ai
            })
        ));
        assert!(matches!(
            engine.flip(&mut fx.table(), Owner::Player, 9),
            Err(GameError::InvalidIndex { .. })
        ));
        engine.flip(&mut fx.table(), Owner::Player, 1).unwrap();
        assert!(matches!(
            engine.flip(&mut fx.table(), Owner::Player, 1),
            Err(GameError::IllegalState { .. })
        ));
        assert_eq!(engine.phase(), Phase::AwaitingSecondFlip);
        assert_eq!(fx.board.revealed_count(), 1);
        assert!(!fx.board.is_hidden(1));
        assert!(matches!(
            engine.resolve_mismatch(&mut fx.table()),
            Err(GameError::IllegalState { .. })
        ));
    }

    #[test]
    fn clearing_the_board_finishes() {
        let mut fx = Fixture::new(1, 2, vec![4, 4]);
        let mut engine = TurnEngine::new(Owner::Ai);
        engine.flip(&mut fx.table(), Owner::Ai, 1).unwrap();
        let outcome = engine.flip(&mut fx.table(), Owner::Ai, 0).unwrap();
        assert!(matches!(
            outcome,
            FlipOutcome::Matched { finished: true, .. }
        ));
        assert!(engine.is_finished());
        assert!(fx.board.is_complete());
        assert_eq!(
            engine.flip(&mut fx.table(), Owner::Ai, 0),
            Err(GameError::GameOver)
        );
        assert_eq!(
            engine.resolve_mismatch(&mut fx.table()),
            Err(GameError::GameOver)
        );
    }

    #[test]
    fn ai_plays_remembered_pairs_until_it_misses() {
        // 0 1 2 3 / 3 2 1 0
        let mut fx = Fixture::new(2, 4, vec![0, 1, 2, 3, 3, 2, 1, 0]);
        for index in [0, 7, 1, 6] {
            let value = fx.board.card(index).unwrap().value;
            fx.memory.observe(index, value);
        }
        let mut engine = TurnEngine::new(Owner::Ai);
        let mut rng = StdRng::seed_from_u64(9);
        let outcomes = engine.play_ai_turn(&mut fx.table(), &mut rng).unwrap();

        assert!(matches!(
            outcomes[1],
            FlipOutcome::Matched {
                owner: Owner::Ai,
                ..
            }
        ));
        assert!(matches!(outcomes[3], FlipOutcome::Matched { .. }));
        assert_eq!(engine.decisions().known_pair, 2);
        assert!(fx.scores.pairs(Owner::Ai) >= 2);
        assert!(matches!(engine.phase(), Phase::Resolving | Phase::Finished));
        assert!(fx.board.revealed_count() <= 2);
    }

    #[test]
    fn ai_turn_is_a_no_op_for_the_player() {
        let mut fx = Fixture::new(2, 2, vec![0, 1, 0, 1]);
        let mut engine = TurnEngine::new(Owner::Player);
        let mut rng = StdRng::seed_from_u64(0);
        let outcomes = engine.play_ai_turn(&mut fx.table(), &mut rng).unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(engine.decisions().total(), 0);
    }
}
