//! Heading filter and head advance
//!
//! The heading is a first-order low-pass toward the target bearing:
//!
//! ```text
//! direction = normalize(direction + (desired - direction) * turn_rate)
//! head      = wrap(head + direction * move_speed)
//! ```
//!
//! so angular velocity is bounded no matter how far the target jumps between
//! vision updates.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::config::SteeringConfig;

/// Unit-length heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction(Vec2);

impl Direction {
    /// Facing +x
    pub const RIGHT: Self = Self(Vec2::X);

    /// Normalize `v`; `None` for zero-length or non-finite input
    pub fn new(v: Vec2) -> Option<Self> {
        v.try_normalize().map(Self)
    }

    pub fn as_vec2(&self) -> Vec2 {
        self.0
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::RIGHT
    }
}

/// Result of one steering step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringStep {
    pub head: Vec2,
    pub direction: Direction,
    /// False when the step degenerated (zero displacement/heading) and the head stayed put
    pub moved: bool,
}

/// Turns a target into a smoothed heading and advances the head
#[derive(Debug, Clone)]
pub struct SteeringEngine {
    config: SteeringConfig,
}

impl SteeringEngine {
    pub fn new(config: SteeringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Advance one tick toward `target`
    pub fn step(&self, head: Vec2, direction: Direction, target: Vec2, arena: &Arena) -> SteeringStep {
        let stay = SteeringStep {
            head,
            direction,
            moved: false,
        };

        let displacement = target - head;
        let distance = displacement.length();
        if !(distance > 0.0) {
            return stay;
        }

        let heading = if distance < self.config.deadband {
            direction
        } else {
            let desired = displacement / distance;
            let current = direction.as_vec2();
            let blended = current + (desired - current) * self.config.turn_rate;
            // Exactly opposing target with turn_rate 0.5 cancels out; veer left
            // so the next tick is no longer collinear
            let veer = || Direction::new(current + current.perp() * self.config.turn_rate);
            match Direction::new(blended).or_else(veer) {
                Some(heading) => heading,
                None => return stay,
            }
        };

        SteeringStep {
            head: arena.wrap(head + heading.as_vec2() * self.config.move_speed),
            direction: heading,
            moved: true,
        }
    }
}
