//! Deterministic RNG hierarchy for simulation paths.
//!
//! A master seed expands into one sub-seed per `(symbol, timeframe, path)`.
//! Sub-seeds are BLAKE3-derived, not drawn sequentially, so a simulation
//! produces the same paths no matter how rayon schedules them.

use rand::rngs::StdRng;
use rand::SeedableRng;
use vantage_core::domain::Timeframe;

#[derive(Debug, Clone, Copy)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one path. Independent of derivation order.
    pub fn sub_seed(&self, symbol: &str, timeframe: Timeframe, path: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(&[0xff]);
        hasher.update(timeframe.as_str().as_bytes());
        hasher.update(&path.to_le_bytes());
        let hash = hasher.finalize();
        let mut word = [0u8; 8];
        word.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(word)
    }

    pub fn rng_for(&self, symbol: &str, timeframe: Timeframe, path: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, timeframe, path))
    }
}
