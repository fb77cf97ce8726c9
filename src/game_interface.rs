//! Module defining traits that need to be implemented to plug a world or a controller into the
//! match runner

use std::{fmt::Debug, path::Path, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};

/// A set of unit commands issued by one player for one tick.
pub trait PlayerAction: Clone + Debug + Serialize + DeserializeOwned {
    /// The action a player issues when it has nothing to do.
    fn empty() -> Self;

    /// True if the action carries no command at all.
    fn is_empty(&self) -> bool;
}

/// The state-transition contract the match runner needs from a world simulation.
///
/// The simulation owns all truth about the match. The runner only loads it, projects
/// observations from it, snapshots it, feeds it actions and advances it.
pub trait Simulation: Clone + Sized + 'static {
    /// Shared, versioned description of unit types (the entity-type catalog).
    type Catalog;
    /// What controllers return to make the world progress.
    type Action: PlayerAction;
    /// Deep, serializable copy of the physical state, stored in traces.
    type Snapshot: Clone + Debug + PartialEq + Serialize + DeserializeOwned;

    /// Load the initial state of a match from a map resource.
    ///
    /// # Error
    /// Returned when the map cannot be read or does not describe a valid world.
    fn load(map: &Path, catalog: &Arc<Self::Catalog>) -> anyhow::Result<Self>;

    /// Rebuild a world from one of its snapshots.
    fn restore(snapshot: Self::Snapshot, catalog: &Arc<Self::Catalog>) -> Self;

    /// Marker of the catalog and of every rule that changes how the world evolves, written at
    /// the top of every trace. Replays require an identical marker.
    fn catalog_version(catalog: &Self::Catalog) -> String;

    /// Current tick counter
    fn time(&self) -> u64;

    /// Fog-limited projection of the world as seen by `player`.
    ///
    /// The projection is an independent value: mutating it never affects `self`.
    fn partial_view(&self, player: usize) -> Self;

    /// Deep copy of the physical state
    fn snapshot(&self) -> Self::Snapshot;

    /// Apply `action` on behalf of `player`.
    ///
    /// Invalid or illegal commands are silently dropped, never reported as errors.
    fn issue_safe(&mut self, player: usize, action: &Self::Action);

    /// Advance the world by one tick. Returns true if the game is over.
    fn cycle(&mut self) -> bool;

    /// The winning player, or `None` for a draw.
    ///
    /// Only meaningful once the game is over or the tick limit is reached.
    fn winner(&self) -> Option<usize>;
}

/// A pluggable decision-making component controlling one player.
pub trait Controller<W: Simulation> {
    /// Identifier used in logs
    fn name(&self) -> &str;

    /// Select the action of `player` given its (possibly fog-limited) view of the world.
    ///
    /// # Error
    /// Any error is treated as a protocol failure and aborts the whole experiment.
    fn get_action(&mut self, player: usize, view: &W) -> anyhow::Result<W::Action>;

    /// Called once when the match ends, with the final winner (`None` for a draw).
    fn game_over(&mut self, _winner: Option<usize>) {}

    /// Bring the controller back to a clean, trial-independent state.
    ///
    /// `seed` is the seed the controller should use for the next trial.
    fn reset(&mut self, seed: u64);
}
