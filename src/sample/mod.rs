//! Uniform samplers for randomized actor parameters
//!
//! Actors draw their personal parameters (walk speed, pause durations,
//! tolerances) from ranges configured once at setup, so a crowd of the
//! same template doesn't move in lockstep. The RNG is caller-owned;
//! tests pass a seeded one.

use rand::Rng;

/// A flat distribution over `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatDistribution {
    /// The left end of the distribution.
    pub min: f32,
    /// The right end of the distribution. Expected to be at least `min`.
    pub max: f32,
}

impl FloatDistribution {
    /// Create a distribution over `[min, max)`.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Draw the next value.
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        self.min + rng.gen_range(0.0f32..1.0) * (self.max - self.min)
    }
}

impl Default for FloatDistribution {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// A flat distribution over `[min, max]`, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntDistribution {
    /// The left end of the distribution.
    pub min: i32,
    /// The right end of the distribution. Must be at least `min`.
    pub max: i32,
}

impl IntDistribution {
    /// Create a distribution over `[min, max]`.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Draw the next value.
    pub fn sample(&self, rng: &mut impl Rng) -> i32 {
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for IntDistribution {
    fn default() -> Self {
        Self { min: 0, max: 1 }
    }
}
