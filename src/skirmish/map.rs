//! JSON map format.
//!
//! ```json
//! {
//!   "width": 8,
//!   "height": 8,
//!   "walls": [[3, 3], [4, 3]],
//!   "units": [
//!     { "player": 0, "kind": "base", "x": 1, "y": 1 },
//!     { "player": 1, "kind": "light", "x": 6, "y": 6 }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use super::catalog::{UnitKind, UnitTypeCatalog};
use super::state::{Battlefield, Unit};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapFile {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub walls: Vec<(i32, i32)>,
    pub units: Vec<MapUnit>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapUnit {
    pub player: usize,
    pub kind: UnitKind,
    pub x: i32,
    pub y: i32,
}

impl MapFile {
    pub fn parse(text: &str) -> anyhow::Result<MapFile> {
        serde_json::from_str(text).context("malformed map file")
    }

    /// Check the map and build the initial battlefield from it.
    pub fn into_battlefield(self, catalog: &UnitTypeCatalog) -> anyhow::Result<Battlefield> {
        if self.width <= 0 || self.height <= 0 {
            bail!("invalid map size {}x{}", self.width, self.height);
        }
        let in_bounds = |x: i32, y: i32| x >= 0 && y >= 0 && x < self.width && y < self.height;

        let mut walls = HashSet::new();
        for &(x, y) in &self.walls {
            if !in_bounds(x, y) {
                bail!("wall ({x}, {y}) is outside the map");
            }
            walls.insert((x, y));
        }

        let mut occupied = HashSet::new();
        let mut units = Vec::with_capacity(self.units.len());
        for (index, unit) in self.units.iter().enumerate() {
            if unit.player > 1 {
                bail!("unit #{index} belongs to unknown player {}", unit.player);
            }
            if !in_bounds(unit.x, unit.y) {
                bail!("unit #{index} at ({}, {}) is outside the map", unit.x, unit.y);
            }
            if walls.contains(&(unit.x, unit.y)) {
                bail!("unit #{index} at ({}, {}) stands on a wall", unit.x, unit.y);
            }
            if !occupied.insert((unit.x, unit.y)) {
                bail!("two units share cell ({}, {})", unit.x, unit.y);
            }
            units.push(Unit {
                id: index as u64 + 1,
                player: unit.player,
                kind: unit.kind,
                x: unit.x,
                y: unit.y,
                hp: catalog.stats(unit.kind).hp,
            });
        }

        let mut walls = walls.into_iter().collect::<Vec<_>>();
        walls.sort_unstable();

        Ok(Battlefield {
            time: 0,
            width: self.width,
            height: self.height,
            walls,
            units,
            assignments: vec![],
        })
    }
}
