//! Shared helpers of the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use skirmish_arena::prelude::*;
use skirmish_arena::skirmish::{SkirmishAction, SkirmishState};
use time::format_description;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Two bases, one cell apart: nothing can ever happen.
pub const STANDOFF: &str = r#"{"width":2,"height":1,"units":[
    {"player":0,"kind":"base","x":0,"y":0},
    {"player":1,"kind":"base","x":1,"y":0}]}"#;

/// Small open field with every unit kind on both sides.
pub const FIELD: &str = r#"{"width":8,"height":8,"walls":[[3,3],[4,4]],"units":[
    {"player":0,"kind":"base","x":0,"y":0},
    {"player":0,"kind":"worker","x":1,"y":0},
    {"player":0,"kind":"light","x":0,"y":1},
    {"player":0,"kind":"ranged","x":1,"y":1},
    {"player":1,"kind":"base","x":7,"y":7},
    {"player":1,"kind":"worker","x":6,"y":7},
    {"player":1,"kind":"heavy","x":7,"y":6},
    {"player":1,"kind":"ranged","x":6,"y":6}]}"#;

pub fn write_map(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

/// Configuration of an experiment living entirely in `dir`.
pub fn experiment_config(
    dir: &Path,
    map: &str,
    player1: &str,
    player2: &str,
) -> ExperimentConfig {
    ExperimentConfig::new(
        MatchSettings::new(map),
        PlayerSettings::new(player1),
        PlayerSettings::new(player2),
    )
    .with_working_dir(dir)
    .with_verbose(false)
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Records every view it receives and never acts.
#[derive(Default)]
pub struct Spy {
    pub views: Vec<(usize, SkirmishState)>,
    pub finished: Vec<Option<usize>>,
    pub resets: Vec<u64>,
}

impl Controller<SkirmishState> for Spy {
    fn name(&self) -> &str {
        "spy"
    }

    fn get_action(&mut self, player: usize, view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
        self.views.push((player, view.clone()));
        Ok(SkirmishAction::empty())
    }

    fn game_over(&mut self, winner: Option<usize>) {
        self.finished.push(winner);
    }

    fn reset(&mut self, seed: u64) {
        self.resets.push(seed);
    }
}

/// Fails on the first tick of its `failing_game`-th match (0-based).
pub struct FailsInGame {
    pub failing_game: usize,
    games_played: usize,
}

impl FailsInGame {
    pub fn new(failing_game: usize) -> Self {
        FailsInGame {
            failing_game,
            games_played: 0,
        }
    }
}

impl Controller<SkirmishState> for FailsInGame {
    fn name(&self) -> &str {
        "fails-in-game"
    }

    fn get_action(&mut self, _player: usize, _view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
        if self.games_played == self.failing_game {
            anyhow::bail!("simulated crash");
        }
        Ok(SkirmishAction::empty())
    }

    fn game_over(&mut self, _winner: Option<usize>) {
        self.games_played += 1;
    }

    fn reset(&mut self, _seed: u64) {}
}

/// Observer counting notifications.
#[derive(Default)]
pub struct Counter {
    pub matches: Vec<MatchOutcome>,
    pub batches: usize,
}

impl ProgressObserver for Counter {
    fn on_match_finished(&mut self, _trial: usize, _total: usize, result: &MatchResult) {
        self.matches.push(result.outcome);
    }

    fn on_batch_finished(&mut self, _report: &BatchReport) {
        self.batches += 1;
    }
}

/// Print every event of the tests, ignoring the error if a subscriber is already installed.
pub fn init_test_logger() {
    let local_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        format_description::parse("[hour]:[minute]:[second]").unwrap(),
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_timer(timer)
        .with_test_writer()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
