//! Composite controller choosing which script plays, segment after segment.
//!
//! The match is cut into segments of `switch_interval` ticks. At the start of each segment the
//! portfolio picks a script epsilon-greedily according to the hit-point balance each script
//! gained during its previous segments. Untried scripts are always tried first.
//!
//! The configuration is an optional TOML file:
//!
//! ```toml
//! scripts = ["rush", "random"]
//! switch_interval = 100
//! epsilon = 0.1
//! ```

use std::{path::Path, sync::Arc};

use anyhow::{bail, Context};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game_interface::Controller;
use crate::skirmish::{SkirmishAction, SkirmishState, UnitTypeCatalog};

use super::{script_by_name, SkirmishController};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortfolioConfig {
    pub scripts: Vec<String>,
    pub switch_interval: u64,
    pub epsilon: f64,
}

impl PortfolioConfig {
    /// Preset used when a player has no configuration file.
    pub fn standard() -> Self {
        PortfolioConfig {
            scripts: vec!["rush".to_owned(), "random".to_owned()],
            switch_interval: 100,
            epsilon: 0.1,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading portfolio config '{}'", path.display()))?;
        let config: PortfolioConfig = toml::from_str(&text)
            .with_context(|| format!("parsing portfolio config '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.scripts.is_empty() {
            bail!("a portfolio needs at least one script");
        }
        if self.switch_interval == 0 {
            bail!("'switch_interval' must be positive");
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            bail!("'epsilon' must be within [0, 1], got {}", self.epsilon);
        }
        Ok(())
    }
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ScriptValue {
    total: f64,
    segments: u32,
}

impl ScriptValue {
    fn mean(&self) -> f64 {
        if self.segments == 0 {
            0.0
        } else {
            self.total / self.segments as f64
        }
    }
}

pub struct Portfolio {
    config: PortfolioConfig,
    scripts: Vec<SkirmishController>,
    values: Vec<ScriptValue>,
    active: usize,
    /// Tick and hit-point balance at the start of the running segment
    segment: Option<(u64, i32)>,
    rng: ChaCha8Rng,
}

impl Portfolio {
    pub fn new(
        catalog: &Arc<UnitTypeCatalog>,
        config: PortfolioConfig,
        seed: u64,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let scripts = config
            .scripts
            .iter()
            .enumerate()
            .map(|(i, name)| script_by_name(name, catalog, script_seed(seed, i)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Portfolio {
            values: vec![ScriptValue::default(); scripts.len()],
            scripts,
            config,
            active: 0,
            segment: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Build from an optional configuration file, falling back on [`PortfolioConfig::standard`].
    pub fn from_file(
        catalog: &Arc<UnitTypeCatalog>,
        config: Option<&Path>,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => PortfolioConfig::load(path)?,
            None => PortfolioConfig::standard(),
        };
        Self::new(catalog, config, seed)
    }

    pub fn active_script(&self) -> &str {
        self.scripts[self.active].name()
    }

    fn choose(&mut self) -> usize {
        if let Some(untried) = self.values.iter().position(|v| v.segments == 0) {
            return untried;
        }
        if self.rng.gen_bool(self.config.epsilon) {
            return self.rng.gen_range(0..self.scripts.len());
        }
        let mut best = 0;
        for (i, value) in self.values.iter().enumerate() {
            if value.mean() > self.values[best].mean() {
                best = i;
            }
        }
        best
    }
}

fn script_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64 + 1)
}

fn balance(view: &SkirmishState, player: usize) -> i32 {
    view.hit_points(player) - view.hit_points(1 - player)
}

impl Controller<SkirmishState> for Portfolio {
    fn name(&self) -> &str {
        "portfolio"
    }

    fn get_action(&mut self, player: usize, view: &SkirmishState) -> anyhow::Result<SkirmishAction> {
        let now = (view.field().time, balance(view, player));
        match self.segment {
            None => {
                self.active = self.choose();
                self.segment = Some(now);
            }
            Some((start, start_balance)) if now.0.saturating_sub(start) >= self.config.switch_interval => {
                let value = &mut self.values[self.active];
                value.total += f64::from(now.1 - start_balance);
                value.segments += 1;
                self.active = self.choose();
                self.segment = Some(now);
                debug!(tick = now.0, script = self.active_script(), "portfolio switch");
            }
            Some(_) => {}
        }
        self.scripts[self.active].get_action(player, view)
    }

    fn game_over(&mut self, winner: Option<usize>) {
        for script in &mut self.scripts {
            script.game_over(winner);
        }
    }

    fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        for (i, script) in self.scripts.iter_mut().enumerate() {
            script.reset(script_seed(seed, i));
        }
        self.values = vec![ScriptValue::default(); self.scripts.len()];
        self.active = 0;
        self.segment = None;
    }
}
