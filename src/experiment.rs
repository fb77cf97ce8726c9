//! Batch execution of matches.
//!
//! An [`Experiment`] owns everything a batch needs: the resolved configuration, the shared catalog
//! and one controller per player, instantiated once and reset between trials.
//!
//! # Behavior
//!
//! Both controllers are first reset with the seeds of trial 0, so a batch replays identically
//! whatever the controllers did before. Then, for every trial, the driver:
//!
//! 1. allocates a fresh trace file if a trace prefix is configured,
//! 2. runs the match,
//! 3. reports progress to a [`ProgressObserver`],
//! 4. appends a row to the summary if one is configured,
//! 5. resets both controllers with the seeds of the next trial.
//!
//! A failing controller aborts the batch: rows already appended stay on disk. A map that cannot
//! be loaded or an artifact that cannot be written only affects its own trial.

use std::{io::Write, path::PathBuf, sync::Arc};

use tracing::{error, info, instrument, trace};

use crate::configuration::{ExperimentConfig, MatchSettings};
use crate::controller_factory::ControllerRegistry;
use crate::controllers::SkirmishController;
use crate::error::ArenaError;
use crate::game_interface::{Controller, Simulation};
use crate::match_runner::{run_match, MatchOutcome, MatchResult};
use crate::seeding::ExperimentSeed;
use crate::skirmish::{SkirmishState, UnitTypeCatalog};
use crate::summary::{ExperimentRecord, SummaryLog};
use crate::trace_files::TraceFileAllocator;

/// Extension of trace files.
pub const TRACE_EXTENSION: &str = "json";

/// Receives a notification after every match of a batch.
pub trait ProgressObserver {
    /// `trial` is 0-based.
    fn on_match_finished(&mut self, trial: usize, total: usize, result: &MatchResult);

    fn on_batch_finished(&mut self, _report: &BatchReport) {}
}

/// Prints one overwritten progress line on stdout, then the tallies.
#[derive(Debug, Default)]
pub struct ConsolePrinter {
    started: bool,
}

impl ProgressObserver for ConsolePrinter {
    fn on_match_finished(&mut self, trial: usize, total: usize, result: &MatchResult) {
        if !self.started {
            disable_line_wrap();
            self.started = true;
        }
        // clear, green, default, start of line
        print!(
            "\x1b[2K\x1b[32mMatch {:8}/{total}:\x1b[39m result {:3} ({}) in {} ms\x1b[0G",
            trial + 1,
            result.outcome.code(),
            result.outcome,
            result.duration.as_millis()
        );
        let _ = std::io::stdout().flush();
    }

    fn on_batch_finished(&mut self, report: &BatchReport) {
        if self.started {
            enable_line_wrap();
        }
        println!("\x1b[2K{report}");
    }
}

/// Only logs progress.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_match_finished(&mut self, trial: usize, total: usize, result: &MatchResult) {
        info!(
            trial = trial + 1,
            total,
            outcome = result.outcome.code(),
            "match finished"
        );
    }
}

fn disable_line_wrap() {
    print!("\x1b[?7l");
}

fn enable_line_wrap() {
    print!("\x1b[?7h");
}

/// Artifacts and seed of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSettings {
    pub num_games: usize,
    /// Traces are named `{prefix}_{index}.json`
    pub trace_prefix: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub seed: ExperimentSeed,
}

impl From<&ExperimentConfig> for BatchSettings {
    fn from(config: &ExperimentConfig) -> Self {
        BatchSettings {
            num_games: config.num_games(),
            trace_prefix: config.trace_prefix(),
            summary: config.summary_path(),
            seed: config.seed(),
        }
    }
}

/// Results of a batch, in trial order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<MatchResult>,
    pub player1_wins: usize,
    pub player2_wins: usize,
    pub draws: usize,
    pub errors: usize,
}

impl BatchReport {
    fn record(&mut self, result: MatchResult) {
        match result.outcome {
            MatchOutcome::Player1Wins => self.player1_wins += 1,
            MatchOutcome::Player2Wins => self.player2_wins += 1,
            MatchOutcome::Draw => self.draws += 1,
            MatchOutcome::Error => self.errors += 1,
        }
        self.results.push(result);
    }

    pub fn games(&self) -> usize {
        self.results.len()
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} matches: {} won by player 1, {} won by player 2, {} draws, {} errors",
            self.games(),
            self.player1_wins,
            self.player2_wins,
            self.draws,
            self.errors
        )
    }
}

/// Play `batch.num_games` matches between the same two controllers.
///
/// # Errors
/// Only fatal errors ([`ArenaError::is_fatal`]) are returned. Summary failures are logged and the
/// batch goes on.
#[instrument(skip_all, fields(games = batch.num_games))]
pub fn run_batch<W: Simulation>(
    controller1: &mut dyn Controller<W>,
    controller2: &mut dyn Controller<W>,
    settings: &MatchSettings,
    catalog: &Arc<W::Catalog>,
    batch: &BatchSettings,
    observer: &mut dyn ProgressObserver,
) -> Result<BatchReport, ArenaError> {
    trace!(?settings, ?batch);
    let mut traces = batch
        .trace_prefix
        .as_ref()
        .map(|prefix| TraceFileAllocator::new(prefix, TRACE_EXTENSION));
    let summary = batch.summary.as_ref().map(SummaryLog::new);
    let mut report = BatchReport::default();

    controller1.reset(batch.seed.controller_seed(0, 0));
    controller2.reset(batch.seed.controller_seed(0, 1));

    for trial in 0..batch.num_games {
        let trace_path = traces.as_mut().map(TraceFileAllocator::next_path);
        let result = run_match(
            &mut *controller1,
            &mut *controller2,
            settings,
            catalog,
            trace_path.as_deref(),
        )
        .inspect_err(|e| error!(trial = trial + 1, "aborting experiment: {e}"))?;

        observer.on_match_finished(trial, batch.num_games, &result);

        if let Some(summary) = &summary {
            if let Err(e) = summary.append(&ExperimentRecord::from(&result)) {
                error!("{:#}", anyhow::Error::from(e));
            }
        }

        controller1.reset(batch.seed.controller_seed(trial + 1, 0));
        controller2.reset(batch.seed.controller_seed(trial + 1, 1));
        report.record(result);
    }

    info!(%report, "experiment finished");
    observer.on_batch_finished(&report);
    Ok(report)
}

/// A batch of skirmish matches, ready to run.
pub struct Experiment {
    config: ExperimentConfig,
    catalog: Arc<UnitTypeCatalog>,
    controllers: [SkirmishController; 2],
}

impl Experiment {
    /// Validate the configuration and instantiate both controllers.
    ///
    /// Both identifiers are checked before anything is built, so an unknown controller fails
    /// before any match and before any artifact is written.
    #[instrument(skip_all)]
    pub fn from_config(
        config: ExperimentConfig,
        registry: &ControllerRegistry<SkirmishState>,
    ) -> Result<Self, ArenaError> {
        config.validate()?;
        registry.validate([
            config.player(0).controller.as_str(),
            config.player(1).controller.as_str(),
        ])?;

        let settings = config.match_settings();
        let catalog = Arc::new(UnitTypeCatalog::new(
            settings.catalog_version,
            settings.conflict_policy,
        ));
        let resolve = |player: usize| {
            registry.resolve(
                &config.player(player).controller,
                &catalog,
                player,
                config.seed(),
                config.player_config(player).as_deref(),
            )
        };
        let controllers = [resolve(0)?, resolve(1)?];
        info!(
            player1 = controllers[0].name(),
            player2 = controllers[1].name(),
            "experiment ready"
        );

        Ok(Experiment {
            config,
            catalog,
            controllers,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run the whole batch.
    pub fn run(&mut self, observer: &mut dyn ProgressObserver) -> Result<BatchReport, ArenaError> {
        let [controller1, controller2] = &mut self.controllers;
        run_batch(
            controller1.as_mut(),
            controller2.as_mut(),
            &self.config.match_settings(),
            &self.catalog,
            &BatchSettings::from(&self.config),
            observer,
        )
    }
}
