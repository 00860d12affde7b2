#![forbid(unsafe_code)]

//! Seedable randomness for the animation engines.
//!
//! Engines take an [`FxRng`] by value so scenario tests can fix the seed and
//! get identical frames; production seeds from OS entropy.

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Random number generator used by every engine.
pub type FxRng = StdRng;

/// Where an engine's randomness comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RngSeed {
    /// Seed from the operating system.
    #[default]
    Entropy,
    /// Fixed seed, reproducible across runs.
    Fixed(u64),
}

impl RngSeed {
    /// Build the generator.
    pub fn into_rng(self) -> FxRng {
        match self {
            Self::Entropy => StdRng::from_os_rng(),
            Self::Fixed(seed) => StdRng::seed_from_u64(seed),
        }
    }

    /// Derive a distinct fixed seed for a sub-component, or stay on entropy.
    #[must_use]
    pub fn fork(self, salt: u64) -> Self {
        match self {
            Self::Entropy => Self::Entropy,
            Self::Fixed(seed) => Self::Fixed(seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        }
    }
}
