use concentration_core::model::owner::Owner;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_ROWS: usize = 4;
const DEFAULT_COLS: usize = 4;
const DEFAULT_AI_MEMORY: usize = 16;
const DEFAULT_MAX_STEPS: usize = 4_096;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub games: GameConfig,
    #[serde(default)]
    pub ai: AiConfig,
    pub agents: Vec<AgentConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.games.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.metrics.validate(&self.agents)?;
        self.logging.normalize();
        validate_agents(&mut self.agents)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// Board layout and seeding shared by every agent.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GameConfig {
    pub seed: Option<u64>,
    pub count: usize,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_cols")]
    pub cols: usize,
    #[serde(default)]
    pub starting_owner: StartingOwner,
}

impl GameConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }

        let cells = self.rows.checked_mul(self.cols).unwrap_or(0);
        if cells == 0 || cells % 2 != 0 {
            return Err(ValidationError::InvalidField {
                field: "games.rows".to_string(),
                message: format!(
                    "a {}x{} grid cannot be dealt in pairs",
                    self.rows, self.cols
                ),
            });
        }

        Ok(())
    }
}

fn default_rows() -> usize {
    DEFAULT_ROWS
}

fn default_cols() -> usize {
    DEFAULT_COLS
}

/// Who opens each game. `alternate` hands the first turn to the scripted
/// seat on even games and to the AI on odd ones.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartingOwner {
    #[default]
    Player,
    Ai,
    Alternate,
}

impl StartingOwner {
    pub fn for_game(self, game_index: usize) -> Owner {
        match self {
            StartingOwner::Player => Owner::Player,
            StartingOwner::Ai => Owner::Ai,
            StartingOwner::Alternate if game_index % 2 == 0 => Owner::Player,
            StartingOwner::Alternate => Owner::Ai,
        }
    }
}

/// Settings for the session-side AI every agent plays against.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AiConfig {
    #[serde(default = "default_ai_memory")]
    pub memory_capacity: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_AI_MEMORY,
        }
    }
}

fn default_ai_memory() -> usize {
    DEFAULT_AI_MEMORY
}

/// Definition of a scripted stand-in for the human seat.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub name: String,
    pub kind: AgentKind,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Random,
    Recall,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Metrics configuration block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
    /// Upper bound on session calls per game before the runner gives up.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl MetricsConfig {
    fn validate(&self, agents: &[AgentConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: "baseline agent must be specified".to_string(),
            });
        };

        if !agents.iter().any(|a| &a.name == baseline) {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: format!("baseline agent '{baseline}' is not defined in agents list"),
            });
        }

        if self.max_steps == 0 {
            return Err(ValidationError::InvalidField {
                field: "metrics.max_steps".to_string(),
                message: "step limit must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_agents(agents: &mut [AgentConfig]) -> Result<(), ValidationError> {
    if agents.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "agents".to_string(),
            message: "at least one agent must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for agent in agents.iter_mut() {
        if agent.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "agents.name".to_string(),
                message: "agent name must not be empty".to_string(),
            });
        }

        if !agent.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(ValidationError::InvalidField {
                field: format!("agents[{}].name", agent.name),
                message: "agent name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(agent.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "agents".to_string(),
                message: format!("agent name '{}' defined more than once", agent.name),
            });
        }

        if agent.params.is_null() {
            agent.params = serde_yaml::Value::Mapping(Default::default());
        }
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory that receives the summary and, when enabled, telemetry.
    pub fn artifact_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "capacity_sweep"
games:
  seed: 7
  count: 32
agents:
  - name: "random"
    kind: "random"
  - name: "recall8"
    kind: "recall"
    params:
      capacity: 8
outputs:
  jsonl: "bench/out/{run_id}/games.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
metrics:
  baseline: "random"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    fn field_of(err: ValidationError) -> String {
        match err {
            ValidationError::InvalidField { field, .. } => field,
        }
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!((cfg.games.rows, cfg.games.cols), (4, 4));
        assert_eq!(cfg.games.starting_owner, StartingOwner::Player);
        assert_eq!(cfg.ai.memory_capacity, DEFAULT_AI_MEMORY);
        assert_eq!(cfg.metrics.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));
        assert!(cfg.agents[0].params.is_mapping());

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/capacity_sweep/games.jsonl")
        );
        assert_eq!(
            outputs.artifact_dir(),
            PathBuf::from("bench/out/capacity_sweep")
        );
    }

    #[test]
    fn rejects_missing_baseline() {
        let yaml = BASIC_YAML.replace("  baseline: \"random\"\n", "");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert_eq!(field_of(err), "metrics.baseline");
    }

    #[test]
    fn rejects_unknown_baseline() {
        let yaml = BASIC_YAML.replace("baseline: \"random\"", "baseline: \"oracle\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert_eq!(field_of(err), "metrics.baseline");
    }

    #[test]
    fn rejects_duplicate_agents() {
        let yaml = BASIC_YAML.replace("name: \"recall8\"", "name: \"random\"");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("duplicate agents should fail");
        assert_eq!(field_of(err), "agents");
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("capacity_sweep", "capacity sweep");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert_eq!(field_of(err), "run_id");
    }

    #[test]
    fn rejects_zero_games() {
        let yaml = BASIC_YAML.replace("count: 32", "count: 0");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("zero games");
        assert_eq!(field_of(err), "games.count");
    }

    #[test]
    fn rejects_odd_grid() {
        let yaml = BASIC_YAML.replace("count: 32\n", "count: 32\n  rows: 3\n  cols: 3\n");
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("odd grid");
        assert_eq!(field_of(err), "games.rows");
    }

    #[test]
    fn alternate_start_flips_every_game() {
        let start = StartingOwner::Alternate;
        assert_eq!(start.for_game(0), Owner::Player);
        assert_eq!(start.for_game(1), Owner::Ai);
        assert_eq!(start.for_game(2), Owner::Player);
        assert_eq!(StartingOwner::Ai.for_game(0), Owner::Ai);
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/summary.md",
            "bench/out/{run_id}/{run_id}.md",
        );
        let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.summary_md,
            PathBuf::from("bench/out/capacity_sweep/capacity_sweep.md")
        );
    }
}
