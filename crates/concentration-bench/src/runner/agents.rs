use std::time::{Duration, Instant};

use concentration_core::SessionSnapshot;
use concentration_core::ai::{Move, Policy, PolicyContext, RandomPolicy, RecallMemory, RecallPolicy};
use concentration_core::model::board::Board;
use concentration_core::model::card::CardState;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::config::{AgentConfig, AgentKind};

const DEFAULT_RECALL_CAPACITY: usize = 16;
const SEAT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid {kind:?} parameter for agent '{name}': {message}")]
    InvalidParam {
        name: String,
        kind: AgentKind,
        message: String,
    },
}

/// Parsed agent definition; spawns a fresh seat for every game.
#[derive(Debug, Clone)]
pub(crate) struct AgentBlueprint {
    pub(crate) name: String,
    pub(crate) kind: AgentKind,
    capacity: usize,
}

impl AgentBlueprint {
    pub(crate) fn from_configs(configs: &[AgentConfig]) -> Result<Vec<Self>, AgentError> {
        configs.iter().map(Self::from_config).collect()
    }

    fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let capacity = match config.kind {
            AgentKind::Random => 0,
            AgentKind::Recall => recall_capacity(config)?,
        };

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            capacity,
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Builds the seat for one game. The seat's RNG is derived from the game
    /// seed so every agent faces a reproducible sequence.
    pub(crate) fn spawn_seat(&self, game_seed: u64) -> SeatState {
        let policy: Box<dyn Policy> = match self.kind {
            AgentKind::Random => Box::new(RandomPolicy),
            AgentKind::Recall => Box::new(RecallPolicy::new()),
        };
        SeatState {
            policy,
            memory: RecallMemory::new(self.capacity),
            rng: StdRng::seed_from_u64(game_seed ^ SEAT_SEED_SALT),
            metrics: DecisionMetrics::default(),
        }
    }
}

fn recall_capacity(config: &AgentConfig) -> Result<usize, AgentError> {
    let invalid = |message: &str| AgentError::InvalidParam {
        name: config.name.clone(),
        kind: config.kind,
        message: message.to_string(),
    };

    let params = &config.params;
    if params.is_null() {
        return Ok(DEFAULT_RECALL_CAPACITY);
    }

    let mapping = params
        .as_mapping()
        .ok_or_else(|| invalid("expected mapping for recall params"))?;

    let capacity_value = mapping
        .iter()
        .find_map(|(key, value)| (key.as_str() == Some("capacity")).then_some(value));

    match capacity_value {
        None => Ok(DEFAULT_RECALL_CAPACITY),
        Some(value) => {
            let capacity = value
                .as_u64()
                .ok_or_else(|| invalid("capacity must be a non-negative integer"))?;
            usize::try_from(capacity).map_err(|_| invalid("capacity is too large"))
        }
    }
}

/// The scripted stand-in for the human seat during one game. It sees only
/// what a snapshot shows, the same as a person at the table.
pub(crate) struct SeatState {
    policy: Box<dyn Policy>,
    memory: RecallMemory,
    rng: StdRng,
    pub(crate) metrics: DecisionMetrics,
}

impl SeatState {
    pub(crate) fn observe(&mut self, snapshot: &SessionSnapshot) {
        for card in &snapshot.cards {
            match card.state {
                CardState::Revealed => {
                    if let Some(value) = card.value {
                        self.memory.observe(card.index, value);
                    }
                }
                CardState::Matched => self.memory.forget(card.index),
                CardState::Hidden => {}
            }
        }
    }

    pub(crate) fn choose(&mut self, board: &Board) -> Option<Move> {
        let ctx = PolicyContext {
            board,
            memory: &self.memory,
        };
        let start = Instant::now();
        let chosen = self.policy.choose_move(&ctx, &mut self.rng);
        self.metrics.record(start.elapsed());
        chosen
    }
}

#[derive(Default)]
pub(crate) struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.decisions += 1;
    }

    pub(crate) fn finalize(&self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}
