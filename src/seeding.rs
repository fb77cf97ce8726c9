//! Explicit experiment seed, threaded through controller construction and resets.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The experiment number, used as the root of every random stream of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExperimentSeed(pub u64);

impl ExperimentSeed {
    /// Seed given to the controller of `player` (0-based) for trial `trial` (0-based).
    ///
    /// Each (trial, player) pair reads its own ChaCha stream, so two players never share
    /// a sequence and every trial starts from a state independent of the previous ones.
    pub fn controller_seed(&self, trial: usize, player: usize) -> u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        rng.set_stream(((trial as u64) << 1) | (player as u64 & 1));
        rng.next_u64()
    }
}

impl From<u64> for ExperimentSeed {
    fn from(value: u64) -> Self {
        ExperimentSeed(value)
    }
}
