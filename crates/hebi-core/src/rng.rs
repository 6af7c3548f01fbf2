//! RNG trait abstraction for the simulation
//!
//! Food respawn and wander targets draw from this trait so that:
//! - the game loop can run on a seeded `Xoshiro256StarStar` (reproducible runs, tests)
//! - callers can hand in any `rand::Rng` (e.g. `rand::rng()`) without adapters

/// Random number generator used by the simulation
pub trait GameRng {
    /// Generate random f32 in [0.0, 1.0)
    fn gen_f32(&mut self) -> f32;

    /// Uniform f32 in [low, high). Returns `low` when the range is empty.
    fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        low + (high - low) * self.gen_f32()
    }

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f32) -> bool {
        self.gen_f32() < probability
    }
}

// Blanket implementation for any type implementing rand::Rng
impl<T: rand::Rng> GameRng for T {
    fn gen_f32(&mut self) -> f32 {
        rand::Rng::random(self)
    }
}
