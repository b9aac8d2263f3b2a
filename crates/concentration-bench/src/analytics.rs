use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use concentration_core::ai::DecisionTally;
use concentration_core::model::score::Outcome;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{AgentConfig, AgentKind, BenchmarkConfig};
use crate::runner::GameOutcome;

const CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("baseline agent '{0}' not present in run results")]
    MissingBaseline(String),
    #[error("agent '{0}' defined in results but missing from configuration")]
    UnknownAgent(String),
    #[error("statistics error: {0}")]
    Statistics(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub struct AnalyticsCollector {
    baseline: String,
    agents: HashMap<String, AgentAccumulator>,
    agent_order: Vec<String>,
    z: f64,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Result<Self, AnalyticsError> {
        let baseline = config
            .metrics
            .baseline
            .clone()
            .ok_or_else(|| AnalyticsError::MissingBaseline("<unset>".into()))?;

        let mut agents = HashMap::new();
        let mut order = Vec::new();
        for agent in &config.agents {
            agents.insert(agent.name.clone(), AgentAccumulator::new(agent));
            order.push(agent.name.clone());
        }

        if !agents.contains_key(&baseline) {
            return Err(AnalyticsError::MissingBaseline(baseline));
        }

        Ok(Self {
            baseline,
            agents,
            agent_order: order,
            z: z_score(CONFIDENCE_LEVEL)?,
        })
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), AnalyticsError> {
        let acc = self
            .agents
            .get_mut(&outcome.agent_name)
            .ok_or_else(|| AnalyticsError::UnknownAgent(outcome.agent_name.clone()))?;
        acc.record_game(outcome);
        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let baseline_margins = self
            .agents
            .get(&self.baseline)
            .map(|acc| acc.margins.clone())
            .ok_or_else(|| AnalyticsError::MissingBaseline(self.baseline.clone()))?;

        let mut reports = Vec::new();
        let mut comparisons = Vec::new();
        for name in &self.agent_order {
            let Some(acc) = self.agents.remove(name) else {
                continue;
            };

            if *name != self.baseline {
                let diffs: Vec<f64> = acc
                    .margins
                    .iter()
                    .filter_map(|(game, margin)| {
                        baseline_margins.get(game).map(|base| (margin - base) as f64)
                    })
                    .collect();
                let (mean_diff, ci95) = mean_with_interval(&diffs, self.z);
                comparisons.push(ComparisonReport {
                    agent: name.clone(),
                    mean_margin_diff: mean_diff,
                    ci95,
                    sample_size: diffs.len(),
                });
            }

            reports.push(acc.into_report(self.z));
        }

        Ok(AnalyticsSummary {
            baseline: self.baseline,
            agents: reports,
            comparisons,
        })
    }
}

fn z_score(level: f64) -> Result<f64, AnalyticsError> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Statistics(err.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + level / 2.0))
}

struct AgentAccumulator {
    name: String,
    config: AgentConfig,
    capacity: usize,
    wins: u32,
    draws: u32,
    losses: u32,
    player_pairs: u64,
    ai_pairs: u64,
    turns: u64,
    player_moves: u64,
    margins: BTreeMap<usize, i64>,
    ai_decisions: DecisionTally,
    total_latency_ms: f64,
    total_decisions: u64,
}

impl AgentAccumulator {
    fn new(config: &AgentConfig) -> Self {
        Self {
            name: config.name.clone(),
            config: config.clone(),
            capacity: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            player_pairs: 0,
            ai_pairs: 0,
            turns: 0,
            player_moves: 0,
            margins: BTreeMap::new(),
            ai_decisions: DecisionTally::default(),
            total_latency_ms: 0.0,
            total_decisions: 0,
        }
    }

    fn record_game(&mut self, outcome: &GameOutcome) {
        let summary = &outcome.summary;
        match summary.outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Lose => self.losses += 1,
        }
        self.capacity = outcome.agent_capacity;
        self.player_pairs += u64::from(summary.player_pairs);
        self.ai_pairs += u64::from(summary.ai_pairs);
        self.turns += u64::from(summary.turns_taken);
        self.player_moves += u64::from(outcome.player_moves);
        self.margins.insert(outcome.game_index, outcome.margin());
        self.ai_decisions.absorb(&summary.ai_decisions);
        self.total_latency_ms += outcome.metrics.total_ms;
        self.total_decisions += u64::from(outcome.metrics.decisions);
    }

    fn into_report(self, z: f64) -> AgentReport {
        let games = self.margins.len();
        let per_game = |total: u64| {
            if games == 0 {
                0.0
            } else {
                total as f64 / games as f64
            }
        };

        let margins: Vec<f64> = self.margins.values().map(|m| *m as f64).collect();
        let (mean_margin, margin_ci95) = mean_with_interval(&margins, z);

        let average_ms_per_move = if self.total_decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_decisions as f64
        };

        AgentReport {
            name: self.name,
            kind: self.config.kind,
            capacity: self.capacity,
            games,
            wins: self.wins as usize,
            draws: self.draws as usize,
            losses: self.losses as usize,
            mean_player_pairs: per_game(self.player_pairs),
            mean_ai_pairs: per_game(self.ai_pairs),
            mean_turns: per_game(self.turns),
            mean_player_moves: per_game(self.player_moves),
            mean_margin,
            margin_ci95,
            ai_decisions: self.ai_decisions,
            average_ms_per_move,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub baseline: String,
    pub agents: Vec<AgentReport>,
    pub comparisons: Vec<ComparisonReport>,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.to_markdown()).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }

    pub fn to_markdown(&self) -> String {
        let mut rows = String::new();
        rows.push_str("# Bench Summary\n\n");
        rows.push_str(&format!("Baseline agent: {}\n\n", self.baseline));
        rows.push_str("| Agent | Kind | Capacity | Games | W/D/L | Win % | Pairs (agent) | Pairs (AI) | Margin | 95% CI | Turns | Avg ms/move |\n");
        rows.push_str("|-------|------|----------|-------|-------|-------|---------------|------------|--------|--------|-------|-------------|\n");

        for agent in &self.agents {
            let win_rate = if agent.games == 0 {
                0.0
            } else {
                agent.wins as f64 / agent.games as f64
            };

            rows.push_str(&format!(
                "| {name} | {kind:?} | {capacity} | {games} | {wins}/{draws}/{losses} | {win:.1}% | {pp:.2} | {ap:.2} | {margin:+.2} | [{lo:.2}, {hi:.2}] | {turns:.2} | {latency:.3} |\n",
                name = agent.name,
                kind = agent.kind,
                capacity = agent.capacity,
                games = agent.games,
                wins = agent.wins,
                draws = agent.draws,
                losses = agent.losses,
                win = win_rate * 100.0,
                pp = agent.mean_player_pairs,
                ap = agent.mean_ai_pairs,
                margin = agent.mean_margin,
                lo = agent.margin_ci95.0,
                hi = agent.margin_ci95.1,
                turns = agent.mean_turns,
                latency = agent.average_ms_per_move,
            ));
        }

        rows.push_str("\n## AI decision mix\n\n");
        rows.push_str("| Opponent | Known pair | Known single | Random |\n");
        rows.push_str("|----------|------------|--------------|--------|\n");
        for agent in &self.agents {
            let tally = &agent.ai_decisions;
            let total = f64::from(tally.total().max(1));
            rows.push_str(&format!(
                "| {name} | {pair:.1}% | {single:.1}% | {random:.1}% |\n",
                name = agent.name,
                pair = f64::from(tally.known_pair) * 100.0 / total,
                single = f64::from(tally.known_single) * 100.0 / total,
                random = f64::from(tally.random) * 100.0 / total,
            ));
        }

        if !self.comparisons.is_empty() {
            rows.push_str(&format!(
                "\n## Margin vs {} (paired by board)\n\n",
                self.baseline
            ));
            rows.push_str("| Agent | Δ margin | 95% CI | Boards |\n");
            rows.push_str("|-------|----------|--------|--------|\n");
            for comparison in &self.comparisons {
                rows.push_str(&format!(
                    "| {agent} | {diff:+.2} | [{lo:.2}, {hi:.2}] | {n} |\n",
                    agent = comparison.agent,
                    diff = comparison.mean_margin_diff,
                    lo = comparison.ci95.0,
                    hi = comparison.ci95.1,
                    n = comparison.sample_size,
                ));
            }
        }

        rows
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentReport {
    pub name: String,
    pub kind: AgentKind,
    pub capacity: usize,
    pub games: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub mean_player_pairs: f64,
    pub mean_ai_pairs: f64,
    pub mean_turns: f64,
    pub mean_player_moves: f64,
    pub mean_margin: f64,
    pub margin_ci95: (f64, f64),
    pub ai_decisions: DecisionTally,
    pub average_ms_per_move: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub agent: String,
    pub mean_margin_diff: f64,
    pub ci95: (f64, f64),
    pub sample_size: usize,
}

fn mean_with_interval(samples: &[f64], z: f64) -> (f64, (f64, f64)) {
    if samples.is_empty() {
        return (0.0, (0.0, 0.0));
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    if samples.len() == 1 {
        return (mean, (mean, mean));
    }
    let variance = samples
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (samples.len() as f64 - 1.0);
    let std_error = (variance / samples.len() as f64).sqrt();
    let margin = z * std_error;
    (mean, (mean - margin, mean + margin))
}
