use super::engine::{FlipOutcome, Phase, Table, TurnEngine};
use super::snapshot::SessionSnapshot;
use crate::ai::policy::DecisionTally;
use crate::ai::recall::RecallMemory;
use crate::error::GameError;
use crate::model::board::Board;
use crate::model::owner::Owner;
use crate::model::score::{Outcome, ScoreTracker};
use core::fmt;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

const DEFAULT_ROWS: usize = 4;
const DEFAULT_COLS: usize = 4;
const DEFAULT_AI_MEMORY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub rows: usize,
    pub cols: usize,
    pub starting_owner: Owner,
    pub ai_memory_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            starting_owner: Owner::Player,
            ai_memory_capacity: DEFAULT_AI_MEMORY,
        }
    }
}

/// Final tally handed to the host once the board is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub player_pairs: u32,
    pub ai_pairs: u32,
    pub turns_taken: u32,
    pub outcome: Outcome,
    pub ai_decisions: DecisionTally,
}

type FinishedHook = Box<dyn FnMut(&GameSummary)>;

/// One game: owns the board, the scores, the AI's memory and the turn
/// engine, and is the only way a host touches any of them.
pub struct GameSession<R = StdRng> {
    config: SessionConfig,
    board: Board,
    scores: ScoreTracker,
    memory: RecallMemory,
    engine: TurnEngine,
    rng: R,
    on_finished: Option<FinishedHook>,
    finish_delivered: bool,
}

impl<R: RngCore> GameSession<R> {
    pub fn start(
        rows: usize,
        cols: usize,
        starting_owner: Owner,
        ai_memory_capacity: usize,
        rng: R,
    ) -> Result<Self, GameError> {
        let config = SessionConfig {
            rows,
            cols,
            starting_owner,
            ai_memory_capacity,
        };
        Self::with_config(config, rng)
    }

    pub fn with_config(config: SessionConfig, mut rng: R) -> Result<Self, GameError> {
        let board = Board::initialize(config.rows, config.cols, &mut rng)?;
        Self::assemble(config, board, rng)
    }

    /// Starts on a caller-supplied layout instead of a shuffled one. Every
    /// card must still be face down.
    pub fn with_board(
        board: Board,
        starting_owner: Owner,
        ai_memory_capacity: usize,
        rng: R,
    ) -> Result<Self, GameError> {
        if board.hidden_count() != board.len() {
            return Err(GameError::illegal("a new game needs every card face down"));
        }
        let config = SessionConfig {
            rows: board.rows(),
            cols: board.cols(),
            starting_owner,
            ai_memory_capacity,
        };
        Self::assemble(config, board, rng)
    }

    fn assemble(config: SessionConfig, board: Board, rng: R) -> Result<Self, GameError> {
        let mut session = Self {
            config,
            board,
            scores: ScoreTracker::new(),
            memory: RecallMemory::new(config.ai_memory_capacity),
            engine: TurnEngine::new(config.starting_owner),
            rng,
            on_finished: None,
            finish_delivered: false,
        };
        event!(
            target: "concentration_core::session",
            Level::INFO,
            rows = config.rows,
            cols = config.cols,
            starting_owner = %config.starting_owner,
            ai_memory_capacity = config.ai_memory_capacity,
            "session started"
        );
        session.advance_ai()?;
        Ok(session)
    }

    /// Deals a fresh board with the same configuration. The finished hook
    /// stays registered.
    pub fn restart(&mut self) -> Result<(), GameError> {
        let board = Board::initialize(self.config.rows, self.config.cols, &mut self.rng)?;
        self.board = board;
        self.scores = ScoreTracker::new();
        self.memory = RecallMemory::new(self.config.ai_memory_capacity);
        self.engine = TurnEngine::new(self.config.starting_owner);
        self.finish_delivered = false;
        event!(
            target: "concentration_core::session",
            Level::INFO,
            "session restarted"
        );
        self.advance_ai()
    }

    pub fn request_flip(
        &mut self,
        owner: Owner,
        index: usize,
    ) -> Result<SessionSnapshot, GameError> {
        let (engine, mut table, _) = self.parts();
        let outcome = engine.flip(&mut table, owner, index)?;
        if matches!(outcome, FlipOutcome::Matched { finished: true, .. }) {
            self.finish();
        }
        self.advance_ai()?;
        Ok(self.snapshot())
    }

    /// Called by the host once its mismatch delay has elapsed.
    pub fn resolve_mismatch(&mut self) -> Result<SessionSnapshot, GameError> {
        let (engine, mut table, _) = self.parts();
        engine.resolve_mismatch(&mut table)?;
        self.advance_ai()?;
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from_parts(&self.board, &self.scores, &self.engine)
    }

    /// Registers the callback that receives the final tally. Fires at once
    /// if the game has already ended.
    pub fn on_finished<F>(&mut self, hook: F)
    where
        F: FnMut(&GameSummary) + 'static,
    {
        self.on_finished = Some(Box::new(hook));
        self.finish_delivered = false;
        if self.engine.is_finished() {
            self.deliver_finish();
        }
    }

    pub fn summary(&self) -> Option<GameSummary> {
        self.engine.is_finished().then(|| GameSummary {
            player_pairs: self.scores.pairs(Owner::Player),
            ai_pairs: self.scores.pairs(Owner::Ai),
            turns_taken: self.scores.turns_taken(),
            outcome: self.scores.outcome(),
            ai_decisions: *self.engine.decisions(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn scores(&self) -> &ScoreTracker {
        &self.scores
    }

    pub fn memory(&self) -> &RecallMemory {
        &self.memory
    }

    pub fn engine(&self) -> &TurnEngine {
        &self.engine
    }

    pub fn decisions(&self) -> &DecisionTally {
        self.engine.decisions()
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn current_owner(&self) -> Owner {
        self.engine.current_owner()
    }

    pub fn is_finished(&self) -> bool {
        self.engine.is_finished()
    }

    fn parts(&mut self) -> (&mut TurnEngine, Table<'_>, &mut R) {
        (
            &mut self.engine,
            Table {
                board: &mut self.board,
                scores: &mut self.scores,
                memory: &mut self.memory,
            },
            &mut self.rng,
        )
    }

    fn advance_ai(&mut self) -> Result<(), GameError> {
        if !self.engine.ai_to_move() {
            return Ok(());
        }
        let (engine, mut table, rng) = self.parts();
        engine.play_ai_turn(&mut table, rng)?;
        if self.engine.is_finished() {
            self.finish();
        }
        Ok(())
    }

    fn finish(&mut self) {
        if let Some(summary) = self.summary() {
            event!(
                target: "concentration_core::session",
                Level::INFO,
                player_pairs = summary.player_pairs,
                ai_pairs = summary.ai_pairs,
                turns_taken = summary.turns_taken,
                outcome = %summary.outcome,
                "game finished"
            );
        }
        self.deliver_finish();
    }

    fn deliver_finish(&mut self) {
        if self.finish_delivered {
            return;
        }
        let Some(summary) = self.summary() else {
            return;
        };
        if let Some(hook) = self.on_finished.as_mut() {
            hook(&summary);
            self.finish_delivered = true;
        }
    }
}

impl GameSession<StdRng> {
    pub fn with_seed(config: SessionConfig, seed: u64) -> Result<Self, GameError> {
        Self::with_config(config, StdRng::seed_from_u64(seed))
    }
}

impl<R> fmt::Debug for GameSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("config", &self.config)
            .field("board", &self.board)
            .field("scores", &self.scores)
            .field("memory", &self.memory)
            .field("engine", &self.engine)
            .field("on_finished", &self.on_finished.is_some())
            .finish_non_exhaustive()
    }
}
