//! Owned per-game state
//!
//! Everything the tick mutates lives in one struct that the game loop passes
//! by reference into each subsystem.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::segment::SegmentChain;
use crate::steering::Direction;

/// State of one running game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub chain: SegmentChain,
    pub direction: Direction,
    pub food: Vec2,
    pub score: u32,
    /// Food eaten this game
    pub pickups: u32,
    /// Ticks simulated this game
    pub ticks: u64,
}

impl GameState {
    pub fn new(chain: SegmentChain, direction: Direction, food: Vec2) -> Self {
        Self {
            chain,
            direction,
            food,
            score: 0,
            pickups: 0,
            ticks: 0,
        }
    }

    pub fn head(&self) -> Vec2 {
        self.chain.head()
    }

    pub fn length(&self) -> usize {
        self.chain.len()
    }
}
