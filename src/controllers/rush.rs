use std::{collections::HashSet, sync::Arc};

use crate::game_interface::Controller;
use crate::skirmish::{within, Order, SkirmishAction, SkirmishState, UnitTypeCatalog};

use super::{nearest_enemy, step_towards};

/// Attack the nearest visible enemy with every unit able to fight.
#[derive(Debug, Default)]
pub struct Rush;

impl Rush {
    pub fn new(_catalog: &Arc<UnitTypeCatalog>) -> Self {
        Rush
    }
}

impl Controller<SkirmishState> for Rush {
    fn name(&self) -> &str {
        "rush"
    }

    fn get_action(&mut self, player: usize, view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
        let mut action = SkirmishAction::default();
        let mut claimed = HashSet::new();
        for unit in view.units_of(player) {
            let stats = view.stats(unit);
            if view.is_busy(unit.id) || !stats.can_attack() {
                continue;
            }
            let Some(enemy) = nearest_enemy(view, player, unit) else {
                continue;
            };
            if within(unit.x, unit.y, enemy.x, enemy.y, stats.range) {
                action.push(
                    unit.id,
                    Order::Attack {
                        x: enemy.x,
                        y: enemy.y,
                    },
                );
            } else if stats.mobile {
                if let Some((direction, cell)) =
                    step_towards(view, unit, (enemy.x, enemy.y), &claimed)
                {
                    claimed.insert(cell);
                    action.push(unit.id, Order::Move { direction });
                }
            }
        }
        Ok(action)
    }

    fn reset(&mut self, _seed: u64) {}
}
