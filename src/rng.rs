//! # RNG seam
//!
//! The fault generator is the only consumer of randomness in the scheduler.
//! It draws through [`FaultRng`] rather than touching `rand` directly so
//! that property tests can pin a seed and reproduce a failing run bit for
//! bit — including proptest's shrinking, which re-runs the same seed many
//! times while shrinking surrounding inputs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Open01};

/// A source of the two distributions the fault model needs.
pub trait FaultRng {
    /// Draw from the open interval `(0, 1)`.
    fn uniform01(&mut self) -> f64;

    /// Draw a geometric random variable with success probability `p`,
    /// i.e. the number of failures before the first success.
    fn geometric(&mut self, p: f64) -> u64;
}

impl<R: Rng> FaultRng for R {
    fn uniform01(&mut self) -> f64 {
        Open01.sample(self)
    }

    fn geometric(&mut self, p: f64) -> u64 {
        let p = p.clamp(1e-9, 1.0);
        rand_distr::Geometric::new(p)
            .expect("p clamped into (0, 1]")
            .sample(self)
    }
}

/// Build a reproducible RNG from a `u64` seed.
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
