//! Food pickup and respawn
//!
//! The only collision in the game: head against the food point. Walls wrap,
//! and the body passes through itself.

use glam::Vec2;

use crate::arena::Arena;
use crate::body::BodyChain;
use crate::config::FoodConfig;
use crate::rng::GameRng;
use crate::state::GameState;

/// One food pickup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pickup {
    /// Where the eaten food was
    pub eaten_at: Vec2,
    /// Where the next food spawned
    pub respawned_at: Vec2,
    /// Score after the pickup
    pub score: u32,
    /// Chain length after growth
    pub length: usize,
}

/// Food proximity test, growth trigger and respawn
#[derive(Debug, Clone)]
pub struct CollisionSystem {
    config: FoodConfig,
}

impl CollisionSystem {
    pub fn new(config: FoodConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FoodConfig {
        &self.config
    }

    /// New food position, uniform over the canvas interior
    pub fn spawn_food<R: GameRng>(&self, arena: &Arena, rng: &mut R) -> Vec2 {
        arena.random_interior(self.config.spawn_margin, rng)
    }

    /// True if the head is within pickup range of the food
    pub fn in_reach(&self, state: &GameState, arena: &Arena) -> bool {
        arena.distance(state.head(), state.food) < self.config.pickup_radius
    }

    /// Test head against food; on contact score, grow and respawn
    pub fn check<R: GameRng>(
        &self,
        state: &mut GameState,
        body: &BodyChain,
        arena: &Arena,
        rng: &mut R,
    ) -> Option<Pickup> {
        if !self.in_reach(state, arena) {
            return None;
        }

        let eaten_at = state.food;
        state.score += self.config.growth_score;
        state.pickups += 1;
        body.grow(&mut state.chain);
        state.food = self.spawn_food(arena, rng);

        log::info!(
            "Food eaten at ({:.0}, {:.0}): score {} length {}",
            eaten_at.x,
            eaten_at.y,
            state.score,
            state.chain.len()
        );

        Some(Pickup {
            eaten_at,
            respawned_at: state.food,
            score: state.score,
            length: state.chain.len(),
        })
    }
}
