mod agents;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use concentration_core::game::engine::Phase;
use concentration_core::model::owner::Owner;
use concentration_core::model::score::Outcome;
use concentration_core::{GameError, GameSession, GameSummary, SessionConfig};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{AgentKind, BenchmarkConfig, ResolvedOutputs};
use crate::logging::TELEMETRY_FILE;

pub use agents::{AgentError, DecisionSummary};
use agents::AgentBlueprint;

/// Plays every configured agent against the session AI on the same boards.
pub struct BenchRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    agents: Vec<AgentBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub agents: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
}

impl BenchRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let agents = AgentBlueprint::from_configs(&config.agents)?;

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            agents,
        })
    }

    /// Execute the run, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut analytics = AnalyticsCollector::new(&self.config)?;

        for game_index in 0..self.config.games.count {
            let game_seed = rng.next_u64();

            for agent in &self.agents {
                let outcome = self.play_game(game_index, game_seed, agent)?;
                analytics.record_game(&outcome)?;
                write_game_row(&mut writer, &self.config, &outcome)?;
                rows_written += 1;
            }
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.artifact_dir().join(TELEMETRY_FILE));

        Ok(RunSummary {
            games_played: self.config.games.count,
            agents: self.agents.len(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
        })
    }

    fn session_config(&self, game_index: usize) -> SessionConfig {
        SessionConfig {
            rows: self.config.games.rows,
            cols: self.config.games.cols,
            starting_owner: self.config.games.starting_owner.for_game(game_index),
            ai_memory_capacity: self.config.ai.memory_capacity,
        }
    }

    fn play_game(
        &self,
        game_index: usize,
        game_seed: u64,
        agent: &AgentBlueprint,
    ) -> Result<GameOutcome, RunnerError> {
        let session_config = self.session_config(game_index);
        let mut session = GameSession::with_seed(session_config, game_seed)?;
        let mut seat = agent.spawn_seat(game_seed);
        seat.observe(&session.snapshot());

        let max_steps = self.config.metrics.max_steps;
        let mut player_moves = 0u32;
        let mut steps = 0usize;

        loop {
            if steps >= max_steps {
                return Err(RunnerError::StepLimit {
                    agent: agent.name.clone(),
                    game_index,
                    max_steps,
                });
            }
            steps += 1;

            match session.phase() {
                Phase::Finished => break,
                Phase::Resolving => {
                    let snapshot = session.resolve_mismatch()?;
                    seat.observe(&snapshot);
                }
                Phase::AwaitingFirstFlip => {
                    if session.current_owner() != Owner::Player {
                        return Err(RunnerError::game(format!(
                            "session idle on the AI's turn in game {game_index}"
                        )));
                    }
                    let chosen = seat.choose(session.board()).ok_or_else(|| {
                        RunnerError::game(format!(
                            "agent '{}' found no legal move in game {game_index}",
                            agent.name
                        ))
                    })?;
                    let snapshot = session.request_flip(Owner::Player, chosen.first)?;
                    seat.observe(&snapshot);
                    let snapshot = session.request_flip(Owner::Player, chosen.second)?;
                    seat.observe(&snapshot);
                    player_moves += 1;
                }
                Phase::AwaitingSecondFlip => {
                    return Err(RunnerError::game(format!(
                        "turn left half-played in game {game_index}"
                    )));
                }
            }
        }

        let summary = session.summary().ok_or_else(|| {
            RunnerError::game(format!("game {game_index} ended without a summary"))
        })?;
        let metrics = seat.metrics.finalize();

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "concentration_bench::game",
                Level::INFO,
                run_id = %self.config.run_id,
                game_index,
                agent = %agent.name,
                player_pairs = summary.player_pairs,
                ai_pairs = summary.ai_pairs,
                turns_taken = summary.turns_taken,
                outcome = %summary.outcome,
                player_moves,
                avg_ms = metrics.avg_ms_per_decision
            );
        }

        Ok(GameOutcome {
            agent_name: agent.name.clone(),
            agent_kind: agent.kind,
            agent_capacity: agent.capacity(),
            game_index,
            game_seed,
            starting_owner: session_config.starting_owner,
            summary,
            player_moves,
            metrics,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    outcome: &GameOutcome,
) -> Result<(), RunnerError> {
    let summary = &outcome.summary;
    let row = GameLogRow {
        run_id: config.run_id.clone(),
        game_id: format!("G{:05}", outcome.game_index),
        game_index: outcome.game_index,
        game_seed: outcome.game_seed,
        agent: outcome.agent_name.clone(),
        kind: outcome.agent_kind,
        capacity: outcome.agent_capacity,
        starting_owner: outcome.starting_owner,
        player_pairs: summary.player_pairs,
        ai_pairs: summary.ai_pairs,
        margin: outcome.margin(),
        turns_taken: summary.turns_taken,
        outcome: summary.outcome,
        player_moves: outcome.player_moves,
        ai_known_pair: summary.ai_decisions.known_pair,
        ai_known_single: summary.ai_decisions.known_single,
        ai_random: summary.ai_decisions.random,
        speed_ms_move: outcome.metrics.avg_ms_per_decision,
    };

    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Result of one agent playing one seeded board.
pub struct GameOutcome {
    pub agent_name: String,
    pub agent_kind: AgentKind,
    pub agent_capacity: usize,
    pub game_index: usize,
    pub game_seed: u64,
    pub starting_owner: Owner,
    pub summary: GameSummary,
    pub player_moves: u32,
    pub metrics: DecisionSummary,
}

impl GameOutcome {
    /// Pairs won by the agent minus pairs won by the AI.
    pub fn margin(&self) -> i64 {
        i64::from(self.summary.player_pairs) - i64::from(self.summary.ai_pairs)
    }

    pub fn outcome(&self) -> Outcome {
        self.summary.outcome
    }
}

#[derive(Serialize)]
struct GameLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    agent: String,
    kind: AgentKind,
    capacity: usize,
    starting_owner: Owner,
    player_pairs: u32,
    ai_pairs: u32,
    margin: i64,
    turns_taken: u32,
    outcome: Outcome,
    player_moves: u32,
    ai_known_pair: u32,
    ai_known_single: u32,
    ai_random: u32,
    speed_ms_move: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Agent(#[from] AgentError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("session rejected a move: {0}")]
    Session(#[from] GameError),
    #[error("game execution failed: {message}")]
    Game { message: String },
    #[error("agent '{agent}' did not finish game {game_index} within {max_steps} steps")]
    StepLimit {
        agent: String,
        game_index: usize,
        max_steps: usize,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn game(message: String) -> Self {
        RunnerError::Game { message }
    }
}
