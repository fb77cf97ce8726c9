use std::sync::Arc;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::game_interface::Controller;
use crate::skirmish::{within, Direction, Order, SkirmishAction, SkirmishState, UnitTypeCatalog};

/// Issues random commands to idle units. Fully determined by its seed.
#[derive(Debug)]
pub struct RandomController {
    rng: ChaCha8Rng,
}

impl RandomController {
    pub fn new(_catalog: &Arc<UnitTypeCatalog>, seed: u64) -> Self {
        RandomController {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Controller<SkirmishState> for RandomController {
    fn name(&self) -> &str {
        "random"
    }

    fn get_action(&mut self, player: usize, view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
        let mut action = SkirmishAction::default();
        for unit in view.units_of(player) {
            if view.is_busy(unit.id) {
                continue;
            }
            let stats = view.stats(unit);
            match self.rng.gen_range(0..3) {
                1 if stats.mobile => {
                    let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
                    action.push(unit.id, Order::Move { direction });
                }
                2 if stats.can_attack() => {
                    let reachable = view
                        .units()
                        .iter()
                        .filter(|u| u.player != player)
                        .filter(|u| within(unit.x, unit.y, u.x, u.y, stats.range))
                        .collect::<Vec<_>>();
                    if let Some(target) = reachable.choose(&mut self.rng) {
                        action.push(
                            unit.id,
                            Order::Attack {
                                x: target.x,
                                y: target.y,
                            },
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(action)
    }

    fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}
