//! A small deterministic grid skirmish, bundled as a reference [`Simulation`](crate::game_interface::Simulation).
//!
//! Two players own units on a rectangular grid. Units receive durative orders (move one cell,
//! attack a cell in range) which resolve on the tick they complete. A player with no unit left
//! loses; a timeout or mutual elimination is a draw.
//!
//! The unit stats and the rule used to settle two moves into the same cell come from the
//! [`UnitTypeCatalog`], which is shared between the world and the controllers.

mod catalog;
mod map;
mod state;

pub use catalog::{CatalogVersion, ConflictPolicy, UnitKind, UnitStats, UnitTypeCatalog};
pub use map::{MapFile, MapUnit};
pub use state::{
    distance2, within, Assignment, Battlefield, Direction, Order, SkirmishAction, SkirmishState, Unit,
    UnitCommand,
};
