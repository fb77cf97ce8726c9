//! # Skirmish Arena
//!
//! A headless match runner and experiment driver for two-player real-time strategy controllers.
//!
//! It provides:
//! - Single match execution with optional fog of war (`run_match`)
//! - Replayable traces of every match, written as JSON ([`trace`])
//! - Batches of matches between the same two controllers, with a CSV summary ([`experiment`])
//! - Resolution of controllers from configured identifiers ([`ControllerRegistry`])
//! - A small deterministic grid world with a few scripted controllers ([`skirmish`], [`controllers`])
//!
//! Each match lets both controllers decide on the same tick, player 1 first, then applies both
//! actions and advances the world. Controllers are created once per experiment and reset between
//! matches with seeds derived from the experiment number, so a batch is reproducible.
//!
//! # Documentation Overview
//!
//! - For the match loop and its outcomes, see the [`match_runner`] module.
//! - For batches, artifacts and progress reporting, see the [`experiment`] module.
//! - For the configuration file format, see [`ExperimentConfig`](crate::configuration::ExperimentConfig).
//! - For plugging another world or controller, check out the [`Simulation`] and [`Controller`] traits.
//!
//! # Usage Example
//!
//! ```no_run
//! use skirmish_arena::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ExperimentConfig::new(
//!         MatchSettings::new("maps/duel8x8.json"),
//!         PlayerSettings::new("rush"),
//!         PlayerSettings::new("portfolio"),
//!     )
//!     .with_num_games(10)
//!     .with_trace_prefix("traces/duel")
//!     .with_summary("summary.csv");
//!
//!     let registry = ControllerRegistry::with_builtins();
//!     let mut experiment = Experiment::from_config(config, &registry)?;
//!     let report = experiment.run(&mut ConsolePrinter::default())?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! [`Simulation`]: crate::game_interface::Simulation
//! [`Controller`]: crate::game_interface::Controller
//! [`ControllerRegistry`]: crate::controller_factory::ControllerRegistry

pub mod configuration;
pub mod controller_factory;
pub mod controllers;
pub mod error;
pub mod experiment;
pub mod game_interface;
pub mod logger;
pub mod match_runner;
pub mod seeding;
pub mod skirmish;
pub mod summary;
pub mod trace;
mod trace_files;

pub use anyhow;
pub use trace_files::TraceFileAllocator;

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use skirmish_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::configuration::{ExperimentConfig, MatchSettings, PlayerSettings};
    pub use crate::controller_factory::ControllerRegistry;
    pub use crate::error::ArenaError;
    pub use crate::experiment::{
        run_batch, BatchReport, BatchSettings, ConsolePrinter, Experiment, LogObserver,
        ProgressObserver,
    };
    pub use crate::game_interface::{Controller, PlayerAction, Simulation};
    pub use crate::match_runner::{run_match, MatchOutcome, MatchResult};
    pub use crate::seeding::ExperimentSeed;
    pub use crate::trace::{verify_replay, MatchTrace};
}
