use std::{collections::HashSet, mem, path::Path, sync::Arc};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::catalog::{ConflictPolicy, UnitKind, UnitStats, UnitTypeCatalog};
use super::map::MapFile;
use crate::game_interface::{PlayerAction, Simulation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u64,
    pub player: usize,
    pub kind: UnitKind,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Order {
    Move { direction: Direction },
    Attack { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCommand {
    pub unit: u64,
    pub order: Order,
}

/// Every command a player issues during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkirmishAction {
    pub commands: Vec<UnitCommand>,
}

impl SkirmishAction {
    pub fn push(&mut self, unit: u64, order: Order) {
        self.commands.push(UnitCommand { unit, order });
    }
}

impl PlayerAction for SkirmishAction {
    fn empty() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// An accepted order, waiting for its completion tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub unit: u64,
    pub player: usize,
    pub order: Order,
    /// Destination of a move, or attacked cell
    pub target: (i32, i32),
    pub issued_at: u64,
    pub completes_at: u64,
}

impl Assignment {
    fn is_move(&self) -> bool {
        matches!(self.order, Order::Move { .. })
    }
}

/// Physical state of a skirmish. This is what traces store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battlefield {
    pub time: u64,
    pub width: i32,
    pub height: i32,
    pub walls: Vec<(i32, i32)>,
    pub units: Vec<Unit>,
    pub assignments: Vec<Assignment>,
}

/// Squared Euclidean distance, saturating at `i64::MAX` for cells far outside any map.
pub fn distance2(ax: i32, ay: i32, bx: i32, by: i32) -> i64 {
    let dx = i64::from(ax) - i64::from(bx);
    let dy = i64::from(ay) - i64::from(by);
    dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
}

/// True if `(bx, by)` lies within `radius` cells of `(ax, ay)`.
pub fn within(ax: i32, ay: i32, bx: i32, by: i32, radius: i32) -> bool {
    let radius = i64::from(radius);
    distance2(ax, ay, bx, by) <= radius * radius
}

/// A running skirmish: the battlefield plus the rules it is played under.
#[derive(Debug, Clone)]
pub struct SkirmishState {
    catalog: Arc<UnitTypeCatalog>,
    field: Battlefield,
}

impl SkirmishState {
    pub fn from_json(text: &str, catalog: &Arc<UnitTypeCatalog>) -> anyhow::Result<Self> {
        let field = MapFile::parse(text)?.into_battlefield(catalog)?;
        Ok(SkirmishState {
            catalog: catalog.clone(),
            field,
        })
    }

    pub fn catalog(&self) -> &UnitTypeCatalog {
        &self.catalog
    }

    pub fn field(&self) -> &Battlefield {
        &self.field
    }

    pub fn width(&self) -> i32 {
        self.field.width
    }

    pub fn height(&self) -> i32 {
        self.field.height
    }

    pub fn units(&self) -> &[Unit] {
        &self.field.units
    }

    pub fn units_of(&self, player: usize) -> impl Iterator<Item = &Unit> + '_ {
        self.field.units.iter().filter(move |u| u.player == player)
    }

    pub fn unit(&self, id: u64) -> Option<&Unit> {
        self.field.units.iter().find(|u| u.id == id)
    }

    pub fn unit_at(&self, x: i32, y: i32) -> Option<&Unit> {
        self.field.units.iter().find(|u| u.x == x && u.y == y)
    }

    pub fn stats(&self, unit: &Unit) -> UnitStats {
        self.catalog.stats(unit.kind)
    }

    pub fn is_busy(&self, unit: u64) -> bool {
        self.field.assignments.iter().any(|a| a.unit == unit)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.field.width && y < self.field.height
    }

    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.field.walls.contains(&(x, y))
    }

    /// In bounds, not a wall and not occupied by a unit.
    pub fn is_free(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && !self.is_wall(x, y) && self.unit_at(x, y).is_none()
    }

    /// Sum of the hit points of the units of `player`.
    pub fn hit_points(&self, player: usize) -> i32 {
        self.units_of(player).map(|u| u.hp).sum()
    }

    pub fn is_visible_to(&self, player: usize, x: i32, y: i32) -> bool {
        self.units_of(player).any(|u| {
            let sight = self.catalog.stats(u.kind).sight;
            within(u.x, u.y, x, y, sight)
        })
    }

    fn unit_mut(&mut self, id: u64) -> Option<&mut Unit> {
        self.field.units.iter_mut().find(|u| u.id == id)
    }

    fn validate(&self, player: usize, command: &UnitCommand) -> Option<Assignment> {
        let unit = self.unit(command.unit)?;
        if unit.player != player || self.is_busy(unit.id) {
            return None;
        }
        let stats = self.stats(unit);
        let (target, duration) = match command.order {
            Order::Move { direction } => {
                let (dx, dy) = direction.delta();
                let target = (unit.x + dx, unit.y + dy);
                if !stats.mobile || !self.is_free(target.0, target.1) {
                    return None;
                }
                (target, stats.move_time)
            }
            Order::Attack { x, y } => {
                if !stats.can_attack()
                    || !self.in_bounds(x, y)
                    || !within(unit.x, unit.y, x, y, stats.range)
                {
                    return None;
                }
                ((x, y), stats.attack_time)
            }
        };
        let now = self.field.time;
        Some(Assignment {
            unit: unit.id,
            player,
            order: command.order,
            target,
            issued_at: now,
            completes_at: now + duration.max(1),
        })
    }

    fn reserve(&mut self, assignment: Assignment) {
        if assignment.is_move() {
            let conflict = self
                .field
                .assignments
                .iter()
                .position(|a| a.is_move() && a.target == assignment.target);
            if let Some(index) = conflict {
                match self.catalog.conflict_policy() {
                    ConflictPolicy::CancelBoth => {
                        self.field.assignments.remove(index);
                    }
                    ConflictPolicy::FirstIssued => {}
                    ConflictPolicy::Alternate => {
                        if (self.field.time % 2) as usize == assignment.player {
                            self.field.assignments[index] = assignment;
                        }
                    }
                }
                return;
            }
        }
        self.field.assignments.push(assignment);
    }

    fn execute(&mut self, assignment: &Assignment) {
        let Some(actor) = self.unit(assignment.unit).filter(|u| u.hp > 0) else {
            return;
        };
        let (x, y) = assignment.target;
        match assignment.order {
            Order::Move { .. } => {
                if self.is_free(x, y) {
                    if let Some(unit) = self.unit_mut(assignment.unit) {
                        unit.x = x;
                        unit.y = y;
                    }
                }
            }
            Order::Attack { .. } => {
                let damage = self.stats(actor).damage;
                if let Some(target) = self.field.units.iter_mut().find(|u| u.x == x && u.y == y)
                {
                    target.hp -= damage;
                }
            }
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.units_of(0).next().is_none() || self.units_of(1).next().is_none()
    }
}

impl Simulation for SkirmishState {
    type Catalog = UnitTypeCatalog;
    type Action = SkirmishAction;
    type Snapshot = Battlefield;

    fn load(map: &Path, catalog: &Arc<UnitTypeCatalog>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(map)
            .with_context(|| format!("reading map '{}'", map.display()))?;
        Self::from_json(&text, catalog)
    }

    fn restore(snapshot: Battlefield, catalog: &Arc<UnitTypeCatalog>) -> Self {
        SkirmishState {
            catalog: catalog.clone(),
            field: snapshot,
        }
    }

    fn catalog_version(catalog: &UnitTypeCatalog) -> String {
        format!("{}/{}", catalog.version(), catalog.conflict_policy())
    }

    fn time(&self) -> u64 {
        self.field.time
    }

    fn partial_view(&self, player: usize) -> Self {
        let mut view = self.clone();
        view.field
            .units
            .retain(|u| u.player == player || self.is_visible_to(player, u.x, u.y));
        let kept = view.field.units.iter().map(|u| u.id).collect::<HashSet<_>>();
        view.field.assignments.retain(|a| kept.contains(&a.unit));
        view
    }

    fn snapshot(&self) -> Battlefield {
        self.field.clone()
    }

    fn issue_safe(&mut self, player: usize, action: &SkirmishAction) {
        for command in &action.commands {
            if let Some(assignment) = self.validate(player, command) {
                self.reserve(assignment);
            }
        }
    }

    fn cycle(&mut self) -> bool {
        self.field.time += 1;
        let now = self.field.time;

        let (due, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.field.assignments)
            .into_iter()
            .partition(|a| a.completes_at <= now);
        self.field.assignments = pending;
        for assignment in &due {
            self.execute(assignment);
        }

        let dead = self
            .field
            .units
            .iter()
            .filter(|u| u.hp <= 0)
            .map(|u| u.id)
            .collect::<HashSet<_>>();
        if !dead.is_empty() {
            self.field.units.retain(|u| !dead.contains(&u.id));
            self.field.assignments.retain(|a| !dead.contains(&a.unit));
        }

        self.is_game_over()
    }

    fn winner(&self) -> Option<usize> {
        let alive0 = self.units_of(0).next().is_some();
        let alive1 = self.units_of(1).next().is_some();
        match (alive0, alive1) {
            (true, false) => Some(0),
            (false, true) => Some(1),
            _ => None,
        }
    }
}
