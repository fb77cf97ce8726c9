//! Experiment configuration
//!
//! An [`ExperimentConfig`] is loaded once per experiment, usually from a TOML file, and is
//! read-only afterwards. It can also be created programmatically with [`ExperimentConfig::new()`]
//! and the `with_*` builder methods, which the command line uses to apply its overrides.
//!
//! # File format
//!
//! ```toml
//! seed = 0                      # experiment number, also the random seed
//! working_dir = "."             # relative paths below are resolved against it
//! verbose = true                # print match progress to stdout
//!
//! [runner]
//! num_games = 10
//! trace_prefix = "traces/match" # enables trace recording, auto-indexed
//! output = "summary.csv"        # summary log
//!
//! [match]
//! map = "maps/bases8x8.json"
//! max_cycles = 3000
//! partially_observable = false
//! conflict_policy = "cancel-both"
//! catalog_version = "v2"
//! decision_budget_ms = 100      # optional
//!
//! [player1]
//! controller = "portfolio"
//! config = "portfolio.toml"     # optional, composite controllers only
//!
//! [player2]
//! controller = "rush"
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::ArenaError;
use crate::seeding::ExperimentSeed;
use crate::skirmish::{CatalogVersion, ConflictPolicy};

/// Default tick limit of a match.
pub const DEFAULT_MAX_CYCLES: u64 = 3000;

/// Settings of a single match: immutable for the whole experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    /// Map location, already resolved against the working directory
    pub map: PathBuf,
    pub max_cycles: u64,
    pub partially_observable: bool,
    pub conflict_policy: ConflictPolicy,
    pub catalog_version: CatalogVersion,
    /// Wall-clock budget of one controller decision. `None` means unbounded.
    pub decision_budget: Option<Duration>,
}

impl MatchSettings {
    pub fn new(map: impl Into<PathBuf>) -> Self {
        MatchSettings {
            map: map.into(),
            max_cycles: DEFAULT_MAX_CYCLES,
            partially_observable: false,
            conflict_policy: ConflictPolicy::default(),
            catalog_version: CatalogVersion::default(),
            decision_budget: None,
        }
    }
}

/// Which controller plays a side, and its optional nested configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSettings {
    pub controller: String,
    pub config: Option<PathBuf>,
}

impl PlayerSettings {
    pub fn new(controller: impl Into<String>) -> Self {
        PlayerSettings {
            controller: controller.into(),
            config: None,
        }
    }
}

/// Configuration of a whole experiment (a batch of matches).
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub(crate) seed: ExperimentSeed,
    pub(crate) working_dir: PathBuf,
    pub(crate) verbose: bool,
    pub(crate) num_games: usize,
    pub(crate) trace_prefix: Option<PathBuf>,
    pub(crate) summary: Option<PathBuf>,
    pub(crate) match_settings: MatchSettings,
    pub(crate) players: [PlayerSettings; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    seed: u64,
    working_dir: Option<PathBuf>,
    #[serde(default = "default_verbose")]
    verbose: bool,
    #[serde(default)]
    runner: RawRunner,
    #[serde(rename = "match")]
    match_settings: RawMatch,
    player1: RawPlayer,
    player2: RawPlayer,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRunner {
    #[serde(default = "default_num_games")]
    num_games: usize,
    trace_prefix: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl Default for RawRunner {
    fn default() -> Self {
        RawRunner {
            num_games: default_num_games(),
            trace_prefix: None,
            output: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMatch {
    map: PathBuf,
    #[serde(default = "default_max_cycles")]
    max_cycles: u64,
    #[serde(default)]
    partially_observable: bool,
    conflict_policy: Option<String>,
    catalog_version: Option<String>,
    decision_budget_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlayer {
    controller: String,
    config: Option<PathBuf>,
}

fn default_verbose() -> bool {
    true
}

fn default_num_games() -> usize {
    1
}

fn default_max_cycles() -> u64 {
    DEFAULT_MAX_CYCLES
}

impl ExperimentConfig {
    /// Create a configuration with default parameters.
    ///
    /// By default:
    /// - The seed is 0 and the working directory is the current one.
    /// - Match progress is printed to stdout.
    /// - A single match is played.
    /// - No trace and no summary are written.
    pub fn new(match_settings: MatchSettings, player1: PlayerSettings, player2: PlayerSettings) -> Self {
        ExperimentConfig {
            seed: ExperimentSeed::default(),
            working_dir: PathBuf::from("."),
            verbose: true,
            num_games: 1,
            trace_prefix: None,
            summary: None,
            match_settings,
            players: [player1, player2],
        }
    }

    /// Read a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArenaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ArenaError::Config(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse a TOML configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ArenaError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|e| ArenaError::Config(e.to_string()))?;

        let conflict_policy = match raw.match_settings.conflict_policy {
            Some(s) => s
                .parse::<ConflictPolicy>()
                .map_err(|e| ArenaError::Config(format!("{e}")))?,
            None => ConflictPolicy::default(),
        };
        let catalog_version = match raw.match_settings.catalog_version {
            Some(s) => s
                .parse::<CatalogVersion>()
                .map_err(|e| ArenaError::Config(format!("{e}")))?,
            None => CatalogVersion::default(),
        };

        let config = ExperimentConfig {
            seed: ExperimentSeed(raw.seed),
            working_dir: raw.working_dir.unwrap_or_else(|| PathBuf::from(".")),
            verbose: raw.verbose,
            num_games: raw.runner.num_games,
            trace_prefix: raw.runner.trace_prefix,
            summary: raw.runner.output,
            match_settings: MatchSettings {
                map: raw.match_settings.map,
                max_cycles: raw.match_settings.max_cycles,
                partially_observable: raw.match_settings.partially_observable,
                conflict_policy,
                catalog_version,
                decision_budget: raw.match_settings.decision_budget_ms.map(Duration::from_millis),
            },
            players: [
                PlayerSettings {
                    controller: raw.player1.controller,
                    config: raw.player1.config,
                },
                PlayerSettings {
                    controller: raw.player2.controller,
                    config: raw.player2.config,
                },
            ],
        };
        config.validate()?;
        Ok(config)
    }

    /// Check entries that the file format cannot express as types.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.match_settings.map.as_os_str().is_empty() {
            return Err(ArenaError::Config("'match.map' is empty".to_owned()));
        }
        for (i, player) in self.players.iter().enumerate() {
            if player.controller.trim().is_empty() {
                return Err(ArenaError::Config(format!(
                    "'player{}.controller' is empty",
                    i + 1
                )));
            }
        }
        if self.match_settings.decision_budget == Some(Duration::ZERO) {
            return Err(ArenaError::Config(
                "'match.decision_budget_ms' must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    /// Override the experiment number (and thus the random seed).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = ExperimentSeed(seed);
        self
    }

    /// Override the directory relative paths are resolved against.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Enable or disable progress printing.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Set the number of matches of the batch.
    pub fn with_num_games(mut self, value: usize) -> Self {
        self.num_games = value;
        self
    }

    /// Enable trace recording, one file per match, named after `prefix`.
    pub fn with_trace_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.trace_prefix = Some(prefix.into());
        self
    }

    /// Append one summary row per match to `path`.
    pub fn with_summary(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary = Some(path.into());
        self
    }

    /// Give a nested configuration file to the controller of the 0-based `player`.
    ///
    /// # Panics
    /// If `player` is neither 0 nor 1.
    pub fn with_player_config(mut self, player: usize, path: impl Into<PathBuf>) -> Self {
        self.players[player].config = Some(path.into());
        self
    }

    pub fn seed(&self) -> ExperimentSeed {
        self.seed
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn num_games(&self) -> usize {
        self.num_games
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// 0-based player settings
    pub fn player(&self, index: usize) -> &PlayerSettings {
        &self.players[index]
    }

    /// Resolve `path` against the working directory, unless it is absolute.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Match settings with every path resolved.
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            map: self.resolve_path(&self.match_settings.map),
            ..self.match_settings.clone()
        }
    }

    pub fn trace_prefix(&self) -> Option<PathBuf> {
        self.trace_prefix.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn summary_path(&self) -> Option<PathBuf> {
        self.summary.as_deref().map(|p| self.resolve_path(p))
    }

    /// Nested configuration of the 0-based player, resolved.
    pub fn player_config(&self, index: usize) -> Option<PathBuf> {
        self.players[index]
            .config
            .as_deref()
            .map(|p| self.resolve_path(p))
    }
}
