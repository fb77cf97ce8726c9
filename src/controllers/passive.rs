use std::sync::Arc;

use crate::game_interface::{Controller, PlayerAction};
use crate::skirmish::{SkirmishAction, SkirmishState, UnitTypeCatalog};

/// Never issues a command.
#[derive(Debug, Default)]
pub struct Passive;

impl Passive {
    pub fn new(_catalog: &Arc<UnitTypeCatalog>) -> Self {
        Passive
    }
}

impl Controller<SkirmishState> for Passive {
    fn name(&self) -> &str {
        "passive"
    }

    fn get_action(&mut self, _player: usize, _view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
        Ok(SkirmishAction::empty())
    }

    fn reset(&mut self, _seed: u64) {}
}
