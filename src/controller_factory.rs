//! Resolution of controller identifiers into live controllers.
//!
//! A [`ControllerRegistry`] maps lowercase identifiers to constructors. Two kinds exist:
//! plain constructors only receive the catalog and a seed, composite ones additionally receive
//! an optional nested configuration file. Identifiers are matched case-insensitively.
//!
//! Every identifier of an experiment is checked with [`ControllerRegistry::validate`] before the
//! first match, so an unknown name never surfaces halfway through a batch.

use std::{collections::BTreeMap, path::Path, sync::Arc};

use tracing::{debug, instrument, warn};

use crate::controllers::{Passive, Portfolio, RandomController, Rush};
use crate::error::ArenaError;
use crate::game_interface::{Controller, Simulation};
use crate::seeding::ExperimentSeed;
use crate::skirmish::SkirmishState;

type PlainConstructor<W> =
    Box<dyn Fn(&Arc<<W as Simulation>::Catalog>, u64) -> anyhow::Result<Box<dyn Controller<W>>>>;
type CompositeConstructor<W> = Box<
    dyn Fn(&Arc<<W as Simulation>::Catalog>, u64, Option<&Path>) -> anyhow::Result<Box<dyn Controller<W>>>,
>;

enum Constructor<W: Simulation> {
    Plain(PlainConstructor<W>),
    Composite(CompositeConstructor<W>),
}

/// Table of the controllers an experiment can instantiate.
pub struct ControllerRegistry<W: Simulation> {
    constructors: BTreeMap<String, Constructor<W>>,
}

impl<W: Simulation> Default for ControllerRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Simulation> ControllerRegistry<W> {
    /// An empty registry.
    pub fn new() -> Self {
        ControllerRegistry {
            constructors: BTreeMap::new(),
        }
    }

    /// Register a controller built from the catalog and a seed.
    ///
    /// Registering an identifier twice replaces the previous constructor.
    pub fn register<F>(&mut self, identifier: &str, constructor: F) -> &mut Self
    where
        F: Fn(&Arc<W::Catalog>, u64) -> anyhow::Result<Box<dyn Controller<W>>> + 'static,
    {
        self.constructors.insert(
            identifier.to_ascii_lowercase(),
            Constructor::Plain(Box::new(constructor)),
        );
        self
    }

    /// Register a controller that also accepts a nested configuration file.
    pub fn register_composite<F>(&mut self, identifier: &str, constructor: F) -> &mut Self
    where
        F: Fn(&Arc<W::Catalog>, u64, Option<&Path>) -> anyhow::Result<Box<dyn Controller<W>>>
            + 'static,
    {
        self.constructors.insert(
            identifier.to_ascii_lowercase(),
            Constructor::Composite(Box::new(constructor)),
        );
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.constructors
            .contains_key(&identifier.to_ascii_lowercase())
    }

    /// Known identifiers, sorted.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    fn unknown(&self, identifier: &str, player: usize) -> ArenaError {
        ArenaError::ControllerResolution {
            identifier: identifier.to_owned(),
            player: player + 1,
            reason: format!(
                "unknown controller, expected one of: {}",
                self.identifiers().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    /// Check that every identifier, given in player order, is known.
    pub fn validate<'a>(
        &self,
        identifiers: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ArenaError> {
        for (player, identifier) in identifiers.into_iter().enumerate() {
            if !self.contains(identifier) {
                return Err(self.unknown(identifier, player));
            }
        }
        Ok(())
    }

    /// Instantiate the controller of `player` (0-based).
    ///
    /// The controller is seeded with the seed of its player before any trial.
    ///
    /// # Errors
    /// [`ArenaError::ControllerResolution`] for unknown identifiers, constructor failures and
    /// invalid nested configurations.
    #[instrument(skip(self, catalog))]
    pub fn resolve(
        &self,
        identifier: &str,
        catalog: &Arc<W::Catalog>,
        player: usize,
        seed: ExperimentSeed,
        config: Option<&Path>,
    ) -> Result<Box<dyn Controller<W>>, ArenaError> {
        let constructor = self
            .constructors
            .get(&identifier.to_ascii_lowercase())
            .ok_or_else(|| self.unknown(identifier, player))?;
        let seed = seed.controller_seed(0, player);

        let built = match constructor {
            Constructor::Plain(build) => {
                if let Some(path) = config {
                    warn!(
                        config = %path.display(),
                        "controller '{identifier}' takes no configuration, ignoring it"
                    );
                }
                build(catalog, seed)
            }
            Constructor::Composite(build) => build(catalog, seed, config),
        };

        built
            .map(|controller| {
                debug!(name = controller.name(), "controller resolved");
                controller
            })
            .map_err(|e| ArenaError::ControllerResolution {
                identifier: identifier.to_owned(),
                player: player + 1,
                reason: format!("{e:#}"),
            })
    }
}

impl ControllerRegistry<SkirmishState> {
    /// Registry holding every bundled skirmish controller.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("passive", |catalog, _| Ok(Box::new(Passive::new(catalog))))
            .register("random", |catalog, seed| {
                Ok(Box::new(RandomController::new(catalog, seed)))
            })
            .register("rush", |catalog, _| Ok(Box::new(Rush::new(catalog))))
            .register_composite("portfolio", |catalog, seed, config| {
                Ok(Box::new(Portfolio::from_file(catalog, config, seed)?))
            });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skirmish::UnitTypeCatalog;

    #[test]
    fn builtins_resolve_case_insensitively() {
        let registry = ControllerRegistry::with_builtins();
        let catalog = Arc::new(UnitTypeCatalog::default());
        assert_eq!(
            registry.identifiers().collect::<Vec<_>>(),
            vec!["passive", "portfolio", "random", "rush"]
        );
        let controller = registry
            .resolve("RUSH", &catalog, 0, ExperimentSeed(1), None)
            .unwrap();
        assert_eq!(controller.name(), "rush");
    }

    #[test]
    fn unknown_identifier_names_the_player() {
        let registry = ControllerRegistry::<SkirmishState>::with_builtins();
        let err = registry.validate(["rush", "turtle"]).unwrap_err();
        match err {
            ArenaError::ControllerResolution {
                identifier, player, ..
            } => {
                assert_eq!(identifier, "turtle");
                assert_eq!(player, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err_is_fatal(&registry));
    }

    fn err_is_fatal(registry: &ControllerRegistry<SkirmishState>) -> bool {
        let catalog = Arc::new(UnitTypeCatalog::default());
        registry
            .resolve("nobody", &catalog, 0, ExperimentSeed(0), None)
            .err()
            .is_some_and(|e| e.is_fatal())
    }

    #[test]
    fn bad_nested_configuration_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolio.toml");
        std::fs::write(&path, "scripts = []\n").unwrap();

        let registry = ControllerRegistry::with_builtins();
        let catalog = Arc::new(UnitTypeCatalog::default());
        let err = registry
            .resolve("portfolio", &catalog, 1, ExperimentSeed(0), Some(&path))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ArenaError::ControllerResolution { player: 2, .. }
        ));
    }

    #[test]
    fn custom_constructors_can_be_registered() {
        let mut registry = ControllerRegistry::<SkirmishState>::new();
        registry.register("Idle", |catalog, _| Ok(Box::new(Passive::new(catalog))));
        assert!(registry.contains("idle"));
        assert!(registry.validate(["IDLE", "idle"]).is_ok());
    }
}
