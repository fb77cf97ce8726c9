use std::sync::Arc;

use skirmish_arena::prelude::*;
use skirmish_arena::skirmish::{Direction, Order, SkirmishAction, SkirmishState, UnitTypeCatalog};
use skirmish_arena::summary::SUMMARY_HEADER;

use crate::fixtures::*;

mod fixtures;

fn batch(num_games: usize, dir: &std::path::Path) -> BatchSettings {
    BatchSettings {
        num_games,
        trace_prefix: Some(dir.join("traces/match")),
        summary: Some(dir.join("summary.csv")),
        seed: ExperimentSeed(7),
    }
}

#[test]
fn single_tick_standoff_is_a_draw() {
    init_test_logger();
    let dir = tempfile::tempdir().unwrap();
    write_map(dir.path(), "standoff.json", STANDOFF);
    let mut settings = MatchSettings::new("standoff.json");
    settings.max_cycles = 1;
    let config = ExperimentConfig::new(
        settings,
        PlayerSettings::new("passive"),
        PlayerSettings::new("passive"),
    )
    .with_working_dir(dir.path())
    .with_verbose(false)
    .with_trace_prefix("traces/standoff")
    .with_summary("summary.csv");

    let registry = ControllerRegistry::with_builtins();
    let mut experiment = Experiment::from_config(config, &registry).unwrap();
    let report = experiment.run(&mut LogObserver).unwrap();
    assert_eq!(report.draws, 1);
    assert_eq!(report.results[0].outcome, MatchOutcome::Draw);
    assert_eq!(report.results[0].ticks, 1);

    let trace_path = dir.path().join("traces/standoff_0.json");
    let replay = MatchTrace::<SkirmishState>::read_from(&trace_path).unwrap();
    assert_eq!(replay.len(), 2);
    assert!(replay.entries().iter().all(|e| e.actions().is_empty()));
    assert_eq!(replay.entries()[1].time(), 1);

    let lines = read_lines(&dir.path().join("summary.csv"));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], SUMMARY_HEADER);
    assert!(lines[1].starts_with("-1,"));
}

#[test]
fn same_seed_gives_identical_traces() {
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        write_map(dir.path(), "field.json", FIELD);
        let config = experiment_config(dir.path(), "field.json", "portfolio", "random")
            .with_seed(42)
            .with_num_games(3)
            .with_trace_prefix("traces/field");
        let registry = ControllerRegistry::with_builtins();
        let mut experiment = Experiment::from_config(config, &registry).unwrap();
        let report = experiment.run(&mut LogObserver).unwrap();
        assert_eq!(report.games(), 3);
        let traces = (0..3)
            .map(|i| std::fs::read(dir.path().join(format!("traces/field_{i}.json"))).unwrap())
            .collect::<Vec<_>>();
        (report, traces)
    };

    let (first_report, first) = run();
    let (second_report, second) = run();
    assert_eq!(first, second);
    let outcomes = |r: &BatchReport| r.results.iter().map(|m| m.outcome).collect::<Vec<_>>();
    assert_eq!(outcomes(&first_report), outcomes(&second_report));
}

#[test]
fn rerunning_an_experiment_replays_it() {
    let dir = tempfile::tempdir().unwrap();
    write_map(dir.path(), "field.json", FIELD);
    let config = experiment_config(dir.path(), "field.json", "random", "random")
        .with_seed(5)
        .with_num_games(2)
        .with_trace_prefix("traces/m");
    let registry = ControllerRegistry::with_builtins();
    let mut experiment = Experiment::from_config(config, &registry).unwrap();

    let first = experiment.run(&mut LogObserver).unwrap();
    let second = experiment.run(&mut LogObserver).unwrap();
    for (a, b) in first.results.iter().zip(&second.results) {
        assert_ne!(a.trace, b.trace);
        let a = std::fs::read(a.trace.as_ref().unwrap()).unwrap();
        let b = std::fs::read(b.trace.as_ref().unwrap()).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn traces_replay_and_end_on_the_final_tick() {
    let dir = tempfile::tempdir().unwrap();
    write_map(dir.path(), "field.json", FIELD);
    let config = experiment_config(dir.path(), "field.json", "rush", "random")
        .with_num_games(2)
        .with_trace_prefix("traces/field");
    let registry = ControllerRegistry::with_builtins();
    let mut experiment = Experiment::from_config(config, &registry).unwrap();
    let report = experiment.run(&mut LogObserver).unwrap();

    let catalog = Arc::new(UnitTypeCatalog::default());
    for result in &report.results {
        let path = result.trace.as_ref().unwrap();
        let replay = MatchTrace::<SkirmishState>::read_from(path).unwrap();
        assert_eq!(replay.len() as u64, result.ticks + 1);
        let last = replay.entries().last().unwrap();
        assert_eq!(last.time(), last.snapshot().time);
        assert!(last.actions().is_empty());
        verify_replay::<SkirmishState>(&replay, &catalog).unwrap();
    }
}

#[test]
fn unknown_controller_aborts_before_any_match() {
    let dir = tempfile::tempdir().unwrap();
    write_map(dir.path(), "field.json", FIELD);
    let config = experiment_config(dir.path(), "field.json", "rush", "turtle")
        .with_num_games(4)
        .with_summary("summary.csv");

    let registry = ControllerRegistry::with_builtins();
    let err = Experiment::from_config(config, &registry).err().unwrap();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        ArenaError::ControllerResolution { player: 2, .. }
    ));
    assert!(!dir.path().join("summary.csv").exists());
}

#[test]
fn corrupt_map_is_an_error_row_and_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let map = write_map(dir.path(), "broken.json", "{\"width\": 4, \"units\": [");
    let settings = MatchSettings::new(map);
    let catalog = Arc::new(UnitTypeCatalog::default());
    let (mut spy1, mut spy2) = (Spy::default(), Spy::default());
    let mut observer = Counter::default();

    let report = run_batch(
        &mut spy1,
        &mut spy2,
        &settings,
        &catalog,
        &batch(2, dir.path()),
        &mut observer,
    )
    .unwrap();

    assert_eq!(report.errors, 2);
    assert_eq!(observer.matches, vec![MatchOutcome::Error; 2]);
    assert_eq!(observer.batches, 1);
    assert!(spy1.views.is_empty() && spy2.views.is_empty());
    assert!(spy1.finished.is_empty());
    assert!(report.results.iter().all(|r| r.trace.is_none()));
    assert!(!dir.path().join("traces/match_0.json").exists());

    let lines = read_lines(&dir.path().join("summary.csv"));
    assert_eq!(lines.len(), 3);
    assert!(lines[1..].iter().all(|l| l.starts_with("2,")));
}

#[test]
fn missing_map_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let settings = MatchSettings::new(dir.path().join("nowhere.json"));
    let catalog = Arc::new(UnitTypeCatalog::default());
    let (mut spy1, mut spy2) = (Spy::default(), Spy::default());

    let result = run_match(&mut spy1, &mut spy2, &settings, &catalog, None).unwrap();
    assert_eq!(result.outcome, MatchOutcome::Error);
    assert_eq!(result.ticks, 0);
    assert!(spy1.views.is_empty());
}

#[test]
fn controller_failure_keeps_earlier_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = MatchSettings::new(write_map(dir.path(), "standoff.json", STANDOFF));
    settings.max_cycles = 5;
    let catalog = Arc::new(UnitTypeCatalog::default());
    let mut spy = Spy::default();
    let mut failing = FailsInGame::new(1);

    let err = run_batch(
        &mut spy,
        &mut failing,
        &settings,
        &catalog,
        &batch(4, dir.path()),
        &mut Counter::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ArenaError::ControllerInvocation {
            player: 2,
            tick: 0,
            ..
        }
    ));

    let lines = read_lines(&dir.path().join("summary.csv"));
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], SUMMARY_HEADER);
    assert!(lines[1].starts_with("-1,"));
    assert!(dir.path().join("traces/match_0.json").exists());
    assert!(!dir.path().join("traces/match_1.json").exists());
}

#[test]
fn controllers_are_reset_with_per_trial_seeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = MatchSettings::new(write_map(dir.path(), "standoff.json", STANDOFF));
    settings.max_cycles = 2;
    let catalog = Arc::new(UnitTypeCatalog::default());
    let (mut spy1, mut spy2) = (Spy::default(), Spy::default());
    let batch = BatchSettings {
        num_games: 3,
        trace_prefix: None,
        summary: None,
        seed: ExperimentSeed(3),
    };

    run_batch(&mut spy1, &mut spy2, &settings, &catalog, &batch, &mut LogObserver).unwrap();
    assert_eq!(spy1.finished, vec![None; 3]);
    assert_eq!(
        spy1.resets,
        (0..=3)
            .map(|trial| ExperimentSeed(3).controller_seed(trial, 0))
            .collect::<Vec<_>>()
    );
    assert_ne!(spy1.resets, spy2.resets);
}

#[test]
fn fog_hides_what_no_own_unit_sees() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = MatchSettings::new(write_map(dir.path(), "field.json", FIELD));
    settings.max_cycles = 20;
    settings.partially_observable = true;
    let catalog = Arc::new(UnitTypeCatalog::default());
    let (mut spy1, mut spy2) = (Spy::default(), Spy::default());
    let trace_path = dir.path().join("fog.json");

    run_match(&mut spy1, &mut spy2, &settings, &catalog, Some(&trace_path)).unwrap();
    let replay = MatchTrace::<SkirmishState>::read_from(&trace_path).unwrap();

    for (player, view) in spy1.views.iter().chain(spy2.views.iter()) {
        let canonical = replay.entries()[view.time() as usize].snapshot();
        let own = canonical.units.iter().filter(|u| u.player == *player).count();
        assert_eq!(view.units_of(*player).count(), own);
        for unit in view.units().iter().filter(|u| u.player != *player) {
            assert!(view.is_visible_to(*player, unit.x, unit.y));
        }
    }

    // both armies start out of sight of each other
    let (_, first) = &spy1.views[0];
    assert!(first.units_of(1).next().is_none());
    assert_eq!(replay.entries()[0].snapshot().units.len(), 8);
}

#[test]
fn decision_budget_drops_late_actions() {
    struct Slow;

    impl Controller<SkirmishState> for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn get_action(
            &mut self,
            player: usize,
            view: &SkirmishState,
        ) -> anyhow::Result<SkirmishAction> {
            std::thread::sleep(std::time::Duration::from_millis(20));
            let mut action = SkirmishAction::default();
            for unit in view.units_of(player) {
                action.push(
                    unit.id,
                    Order::Move {
                        direction: Direction::ALL[0],
                    },
                );
            }
            Ok(action)
        }

        fn reset(&mut self, _seed: u64) {}
    }

    let dir = tempfile::tempdir().unwrap();
    let mut settings = MatchSettings::new(write_map(dir.path(), "field.json", FIELD));
    settings.max_cycles = 3;
    settings.decision_budget = Some(std::time::Duration::from_millis(1));
    let catalog = Arc::new(UnitTypeCatalog::default());
    let trace_path = dir.path().join("slow.json");

    let result = run_match(&mut Slow, &mut Spy::default(), &settings, &catalog, Some(&trace_path))
        .unwrap();
    assert_eq!(result.outcome, MatchOutcome::Draw);
    let replay = MatchTrace::<SkirmishState>::read_from(&trace_path).unwrap();
    assert!(replay.entries().iter().all(|e| e.actions().is_empty()));
}

#[test]
fn bundled_configuration_parses() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let config = ExperimentConfig::load(root.join("config/arena.toml"))
        .unwrap()
        .with_working_dir(root);
    assert_eq!(config.player(0).controller, "portfolio");
    assert!(config.match_settings().map.exists());
    assert!(config.player_config(0).unwrap().exists());

    let registry = ControllerRegistry::with_builtins();
    let catalog = Arc::new(UnitTypeCatalog::default());
    let portfolio = registry
        .resolve(
            "portfolio",
            &catalog,
            0,
            config.seed(),
            config.player_config(0).as_deref(),
        )
        .unwrap();
    assert_eq!(portfolio.name(), "portfolio");
    SkirmishState::load(&config.match_settings().map, &catalog).unwrap();
}

#[test]
fn unwritable_traces_do_not_change_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = MatchSettings::new(write_map(dir.path(), "standoff.json", STANDOFF));
    settings.max_cycles = 3;
    let catalog = Arc::new(UnitTypeCatalog::default());
    // a regular file where the trace directory should be
    std::fs::write(dir.path().join("blocker"), "").unwrap();
    let batch = BatchSettings {
        num_games: 3,
        trace_prefix: Some(dir.path().join("blocker/match")),
        summary: Some(dir.path().join("summary.csv")),
        seed: ExperimentSeed(1),
    };
    let mut observer = Counter::default();

    let report = run_batch(
        &mut Spy::default(),
        &mut Spy::default(),
        &settings,
        &catalog,
        &batch,
        &mut observer,
    )
    .unwrap();

    assert_eq!(report.games(), 3);
    assert_eq!(observer.matches, vec![MatchOutcome::Draw; 3]);
    for result in &report.results {
        assert_eq!(result.outcome, MatchOutcome::Draw);
        assert_eq!(result.ticks, 3);
        assert!(result.trace.is_none());
    }
    let lines = read_lines(&dir.path().join("summary.csv"));
    assert_eq!(lines.len(), 4);
    assert!(lines[1..].iter().all(|l| l.starts_with("-1,")));
}

#[test]
fn unwritable_summary_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = MatchSettings::new(write_map(dir.path(), "standoff.json", STANDOFF));
    settings.max_cycles = 3;
    let catalog = Arc::new(UnitTypeCatalog::default());
    let summary = dir.path().join("missing/dir/summary.csv");
    let batch = BatchSettings {
        num_games: 4,
        trace_prefix: Some(dir.path().join("traces/match")),
        summary: Some(summary.clone()),
        seed: ExperimentSeed(1),
    };
    let mut observer = Counter::default();

    let report = run_batch(
        &mut Spy::default(),
        &mut Spy::default(),
        &settings,
        &catalog,
        &batch,
        &mut observer,
    )
    .unwrap();

    assert_eq!(report.games(), 4);
    assert_eq!(report.draws, 4);
    assert_eq!(observer.batches, 1);
    for (i, result) in report.results.iter().enumerate() {
        assert_eq!(
            result.trace.as_deref(),
            Some(dir.path().join(format!("traces/match_{i}.json")).as_path())
        );
    }
    assert!(!summary.exists());
}
