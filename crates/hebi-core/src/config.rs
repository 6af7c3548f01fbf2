//! Simulation tuning
//!
//! Every constant the simulation reads lives here so the binary can layer
//! file and environment overrides on top of the compiled defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arena::Arena;

/// All tuning for one game
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GameConfig {
    #[serde(default)]
    pub arena: Arena,

    #[serde(default)]
    pub steering: SteeringConfig,

    #[serde(default)]
    pub body: BodyConfig,

    #[serde(default)]
    pub food: FoodConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,
}

/// Heading filter and movement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SteeringConfig {
    /// Fraction of the heading error corrected per tick (0, 1]
    pub turn_rate: f32,
    /// Head advance in pixels per tick
    pub move_speed: f32,
    /// Targets closer than this leave the heading untouched
    pub deadband: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            turn_rate: 0.15,
            move_speed: 3.0,
            deadband: 10.0,
        }
    }
}

/// Segment chain shape and growth
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyConfig {
    /// Rest distance between adjacent segments (pixels)
    pub segment_spacing: f32,
    /// Segments (head included) on a fresh start
    pub initial_length: usize,
    /// Segments appended per pickup
    pub growth_segments: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            segment_spacing: 5.0,
            initial_length: 20,
            growth_segments: 5,
        }
    }
}

/// Food pickup and respawn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodConfig {
    /// Head-to-food distance that counts as eating (pixels)
    pub pickup_radius: f32,
    /// Points awarded per pickup
    pub growth_score: u32,
    /// Respawn keeps this far from every edge (pixels)
    pub spawn_margin: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            pickup_radius: 20.0,
            growth_score: 10,
            spawn_margin: 50.0,
        }
    }
}

/// Tracked-signal liveness and wander fallback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingConfig {
    /// Maximum signal age before falling back to wander (milliseconds)
    pub liveness_timeout_ms: u64,
    /// Per-tick chance of picking a new wander target
    pub wander_resample_chance: f32,
    /// Mirror x (`x -> 1 - x`) to match a mirrored camera preview
    pub mirror_x: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: 2000,
            wander_resample_chance: 0.02,
            mirror_x: true,
        }
    }
}

/// Rejected tuning values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("arena must have a positive size, got {width}x{height}")]
    EmptyArena { width: f32, height: f32 },
    #[error("turn rate must be in (0, 1], got {0}")]
    TurnRate(f32),
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("initial length must be at least 1 segment")]
    EmptyBody,
    #[error("wander resample chance must be in [0, 1], got {0}")]
    ResampleChance(f32),
}

impl GameConfig {
    /// Check the values the simulation divides by or normalizes against
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Arena { width, height } = self.arena;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(ConfigError::EmptyArena { width, height });
        }

        let turn_rate = self.steering.turn_rate;
        if !(turn_rate > 0.0 && turn_rate <= 1.0) {
            return Err(ConfigError::TurnRate(turn_rate));
        }

        for (field, value) in [
            ("steering.move_speed", self.steering.move_speed),
            ("body.segment_spacing", self.body.segment_spacing),
            ("food.pickup_radius", self.food.pickup_radius),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if self.body.initial_length == 0 {
            return Err(ConfigError::EmptyBody);
        }

        let chance = self.tracking.wander_resample_chance;
        if !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::ResampleChance(chance));
        }

        Ok(())
    }
}
