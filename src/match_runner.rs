//! Execution of a single match.
//!
//! [`run_match`] loads the world, then repeats until the game is over or the tick limit is
//! reached: project each player's view, ask both controllers for their action (player 1 first),
//! snapshot the world into the trace, apply both actions and advance one tick. Once the loop
//! exits, controllers are told the winner, the terminal state is traced, and the trace is written
//! if an output path was given.
//!
//! A map that cannot be loaded ends the match immediately with [`MatchOutcome::Error`]: no
//! controller is invoked and no trace is written. A failing controller aborts the match with
//! [`ArenaError::ControllerInvocation`].

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::configuration::MatchSettings;
use crate::error::ArenaError;
use crate::game_interface::{Controller, PlayerAction, Simulation};
use crate::trace::{MatchTrace, Trace, TraceEntry};

/// Final status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    Draw,
    Player1Wins,
    Player2Wins,
    /// The match could not start
    Error,
}

impl MatchOutcome {
    /// Numeric code used in summaries and progress reports.
    pub const fn code(self) -> i32 {
        match self {
            MatchOutcome::Error => 2,
            MatchOutcome::Draw => -1,
            MatchOutcome::Player1Wins => 0,
            MatchOutcome::Player2Wins => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            2 => Some(MatchOutcome::Error),
            -1 => Some(MatchOutcome::Draw),
            0 => Some(MatchOutcome::Player1Wins),
            1 => Some(MatchOutcome::Player2Wins),
            _ => None,
        }
    }

    /// Outcome for a 0-based winner, `None` being a draw.
    pub fn from_winner(winner: Option<usize>) -> Self {
        match winner {
            Some(0) => MatchOutcome::Player1Wins,
            Some(_) => MatchOutcome::Player2Wins,
            None => MatchOutcome::Draw,
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchOutcome::Draw => "draw",
            MatchOutcome::Player1Wins => "player 1 wins",
            MatchOutcome::Player2Wins => "player 2 wins",
            MatchOutcome::Error => "error",
        };
        f.write_str(name)
    }
}

/// Outcome of a match, with its timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    /// Number of ticks executed
    pub ticks: u64,
    pub started: OffsetDateTime,
    pub finished: OffsetDateTime,
    pub duration: Duration,
    /// Where the trace was written, if it was
    pub trace: Option<PathBuf>,
}

struct Stopwatch {
    started: OffsetDateTime,
    clock: Instant,
}

impl Stopwatch {
    fn start() -> Self {
        Stopwatch {
            started: OffsetDateTime::now_utc(),
            clock: Instant::now(),
        }
    }

    fn finish(self, outcome: MatchOutcome, ticks: u64, trace: Option<PathBuf>) -> MatchResult {
        MatchResult {
            outcome,
            ticks,
            duration: self.clock.elapsed(),
            started: self.started,
            finished: OffsetDateTime::now_utc(),
            trace,
        }
    }
}

fn load_world<W: Simulation>(settings: &MatchSettings, catalog: &Arc<W::Catalog>) -> Result<W, ArenaError> {
    W::load(&settings.map, catalog).map_err(|e| ArenaError::MapLoad {
        path: settings.map.clone(),
        source: e.into(),
    })
}

/// Ask one controller for its action, enforcing the decision budget if any.
fn decide<W: Simulation>(
    controller: &mut dyn Controller<W>,
    player: usize,
    view: &W,
    budget: Option<Duration>,
) -> Result<W::Action, ArenaError> {
    let clock = Instant::now();
    let action = controller
        .get_action(player, view)
        .map_err(|source| ArenaError::ControllerInvocation {
            controller: controller.name().to_owned(),
            player: player + 1,
            tick: view.time(),
            source: source.into(),
        })?;

    match budget {
        Some(budget) if clock.elapsed() > budget => {
            warn!(
                controller = controller.name(),
                player = player + 1,
                tick = view.time(),
                elapsed = ?clock.elapsed(),
                ?budget,
                "decision budget exceeded, action dropped"
            );
            Ok(W::Action::empty())
        }
        _ => Ok(action),
    }
}

/// Run one match between `controller1` (player 1) and `controller2` (player 2).
///
/// # Errors
/// Only [`ArenaError::ControllerInvocation`] is returned: every other failure is either
/// reported as [`MatchOutcome::Error`] (map loading) or logged (trace writing).
#[instrument(skip_all, fields(map = %settings.map.display()))]
pub fn run_match<W: Simulation>(
    controller1: &mut dyn Controller<W>,
    controller2: &mut dyn Controller<W>,
    settings: &MatchSettings,
    catalog: &Arc<W::Catalog>,
    trace_output: Option<&Path>,
) -> Result<MatchResult, ArenaError> {
    let stopwatch = Stopwatch::start();

    let mut state: W = match load_world(settings, catalog) {
        Ok(state) => state,
        Err(e) => {
            error!("{:#}", anyhow::Error::from(e));
            error!("aborting match execution");
            return Ok(stopwatch.finish(MatchOutcome::Error, 0, None));
        }
    };
    debug!(
        controller1 = controller1.name(),
        controller2 = controller2.name(),
        "match started"
    );

    let mut replay: MatchTrace<W> = Trace::new(W::catalog_version(catalog));
    let mut ticks = 0;
    let mut game_over = false;

    while !game_over && state.time() < settings.max_cycles {
        let tick = state.time();
        trace!(tick);

        let (action1, action2) = if settings.partially_observable {
            let view1 = state.partial_view(0);
            let view2 = state.partial_view(1);
            (
                decide(controller1, 0, &view1, settings.decision_budget)?,
                decide(controller2, 1, &view2, settings.decision_budget)?,
            )
        } else {
            (
                decide(controller1, 0, &state, settings.decision_budget)?,
                decide(controller2, 1, &state, settings.decision_budget)?,
            )
        };

        let mut entry = TraceEntry::new(tick, state.snapshot());
        if !action1.is_empty() {
            entry = entry.with_action(0, action1.clone());
        }
        if !action2.is_empty() {
            entry = entry.with_action(1, action2.clone());
        }
        replay.push(entry);

        state.issue_safe(0, &action1);
        state.issue_safe(1, &action2);

        game_over = state.cycle();
        ticks += 1;
    }

    let winner = state.winner();
    controller1.game_over(winner);
    controller2.game_over(winner);

    replay.push(TraceEntry::new(state.time(), state.snapshot()));

    let written = trace_output.and_then(|path| match replay.write_to(path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(e) => {
            error!("{:#}", anyhow::Error::from(e));
            None
        }
    });

    let outcome = MatchOutcome::from_winner(winner);
    info!(%outcome, ticks, game_over, "match finished");
    Ok(stopwatch.finish(outcome, ticks, written))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::controllers::{Passive, Rush};
    use crate::skirmish::{SkirmishAction, SkirmishState, UnitTypeCatalog};

    fn write_map(dir: &Path, json: &str) -> PathBuf {
        let path = dir.join("map.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    const DUEL: &str = r#"{"width":6,"height":1,"units":[
        {"player":0,"kind":"light","x":0,"y":0},
        {"player":1,"kind":"worker","x":5,"y":0}]}"#;

    struct Failing;

    impl Controller<SkirmishState> for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn get_action(&mut self, _player: usize, view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
            if view.time() >= 2 {
                anyhow::bail!("lost connection")
            }
            Ok(SkirmishAction::default())
        }

        fn reset(&mut self, _seed: u64) {}
    }

    #[test]
    fn outcome_codes() {
        assert_eq!(MatchOutcome::Error.code(), 2);
        assert_eq!(MatchOutcome::Draw.code(), -1);
        assert_eq!(MatchOutcome::Player1Wins.code(), 0);
        assert_eq!(MatchOutcome::Player2Wins.code(), 1);
        for outcome in [
            MatchOutcome::Error,
            MatchOutcome::Draw,
            MatchOutcome::Player1Wins,
            MatchOutcome::Player2Wins,
        ] {
            assert_eq!(MatchOutcome::from_code(outcome.code()), Some(outcome));
        }
        assert_eq!(MatchOutcome::from_winner(Some(1)), MatchOutcome::Player2Wins);
    }

    #[test]
    fn rush_beats_passive() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MatchSettings::new(write_map(dir.path(), DUEL));
        let catalog = Arc::new(UnitTypeCatalog::default());
        let trace_path = dir.path().join("trace_0.json");

        let result = run_match(
            &mut Rush,
            &mut Passive,
            &settings,
            &catalog,
            Some(&trace_path),
        )
        .unwrap();
        assert_eq!(result.outcome, MatchOutcome::Player1Wins);
        assert_eq!(result.trace.as_deref(), Some(trace_path.as_path()));

        let replay = MatchTrace::<SkirmishState>::read_from(&trace_path).unwrap();
        assert_eq!(replay.len() as u64, result.ticks + 1);
        assert_eq!(replay.entries().last().unwrap().time(), result.ticks);
        crate::trace::verify_replay::<SkirmishState>(&replay, &catalog).unwrap();
    }

    #[test]
    fn replay_needs_the_same_ruleset() {
        use crate::skirmish::{CatalogVersion, ConflictPolicy};

        let dir = tempfile::tempdir().unwrap();
        let settings = MatchSettings::new(write_map(dir.path(), DUEL));
        let catalog = Arc::new(UnitTypeCatalog::default());
        let trace_path = dir.path().join("trace_0.json");
        run_match(&mut Rush, &mut Passive, &settings, &catalog, Some(&trace_path)).unwrap();

        let replay = MatchTrace::<SkirmishState>::read_from(&trace_path).unwrap();
        assert_eq!(replay.catalog_version(), "v2/cancel-both");
        let other = Arc::new(UnitTypeCatalog::new(
            CatalogVersion::V2,
            ConflictPolicy::FirstIssued,
        ));
        let err = crate::trace::verify_replay::<SkirmishState>(&replay, &other).unwrap_err();
        assert!(err.to_string().contains("recorded with catalog 'v2/cancel-both'"));
    }

    #[test]
    fn controller_failure_aborts_without_trace() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MatchSettings::new(write_map(dir.path(), DUEL));
        let catalog = Arc::new(UnitTypeCatalog::default());
        let trace_path = dir.path().join("trace_0.json");

        let err = run_match(
            &mut Passive,
            &mut Failing,
            &settings,
            &catalog,
            Some(&trace_path),
        )
        .unwrap_err();
        match err {
            ArenaError::ControllerInvocation { player, tick, .. } => {
                assert_eq!(player, 2);
                assert_eq!(tick, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!trace_path.exists());
    }

    #[test]
    fn tick_limit_is_a_draw() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = MatchSettings::new(write_map(dir.path(), DUEL));
        settings.max_cycles = 7;
        let catalog = Arc::new(UnitTypeCatalog::default());
        let result = run_match(&mut Passive, &mut Passive, &settings, &catalog, None).unwrap();
        assert_eq!(result.outcome, MatchOutcome::Draw);
        assert_eq!(result.ticks, 7);
        assert!(result.trace.is_none());
    }
}
