//! Built-in controllers for the bundled [`skirmish`](crate::skirmish) world.
//!
//! - [`Passive`]: never issues a command
//! - [`RandomController`]: issues random commands from a seeded generator
//! - [`Rush`]: sends every attacking unit against the nearest visible enemy
//! - [`Portfolio`]: composite switching between the scripts above, configurable per player

use std::{collections::HashSet, sync::Arc};

use anyhow::bail;

use crate::game_interface::Controller;
use crate::skirmish::{distance2, Direction, SkirmishState, Unit, UnitTypeCatalog};

mod passive;
mod portfolio;
mod random;
mod rush;

pub use passive::Passive;
pub use portfolio::{Portfolio, PortfolioConfig};
pub use random::RandomController;
pub use rush::Rush;

/// Boxed controller playing the skirmish world.
pub type SkirmishController = Box<dyn Controller<SkirmishState>>;

/// Names of the scripts a [`Portfolio`] can switch between.
pub const SCRIPT_NAMES: [&str; 3] = ["passive", "random", "rush"];

/// Build one of the basic scripts by name.
pub fn script_by_name(
    name: &str,
    catalog: &Arc<UnitTypeCatalog>,
    seed: u64,
) -> anyhow::Result<SkirmishController> {
    let controller: SkirmishController = match name.to_ascii_lowercase().as_str() {
        "passive" => Box::new(Passive::new(catalog)),
        "random" => Box::new(RandomController::new(catalog, seed)),
        "rush" => Box::new(Rush::new(catalog)),
        other => bail!("unknown script '{other}'"),
    };
    Ok(controller)
}

/// Closest enemy of `player` visible in `view`, ties broken by unit id.
pub(crate) fn nearest_enemy<'a>(
    view: &'a SkirmishState,
    player: usize,
    from: &Unit,
) -> Option<&'a Unit> {
    view.units()
        .iter()
        .filter(|u| u.player != player)
        .min_by_key(|u| (distance2(from.x, from.y, u.x, u.y), u.id))
}

/// Direction bringing `unit` strictly closer to `(x, y)` through a free, unclaimed cell.
pub(crate) fn step_towards(
    view: &SkirmishState,
    unit: &Unit,
    (x, y): (i32, i32),
    claimed: &HashSet<(i32, i32)>,
) -> Option<(Direction, (i32, i32))> {
    let current = distance2(unit.x, unit.y, x, y);
    Direction::ALL
        .iter()
        .filter_map(|&direction| {
            let (dx, dy) = direction.delta();
            let cell = (unit.x + dx, unit.y + dy);
            if view.is_free(cell.0, cell.1) && !claimed.contains(&cell) {
                Some((distance2(cell.0, cell.1, x, y), direction, cell))
            } else {
                None
            }
        })
        .filter(|(distance, _, _)| *distance < current)
        .min_by_key(|(distance, _, _)| *distance)
        .map(|(_, direction, cell)| (direction, cell))
}
