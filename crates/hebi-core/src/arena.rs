//! Play-area bounds and toroidal geometry
//!
//! The arena wraps on both axes: leaving one edge re-enters at the opposite
//! edge. Distances between bodies are measured along the shortest wrapped path
//! so a snake straddling an edge still reads as contiguous.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rng::GameRng;

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.size() * 0.5
    }

    /// Map a point back into `[0, width) x [0, height)`
    pub fn wrap(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            wrap_axis(point.x, self.width),
            wrap_axis(point.y, self.height),
        )
    }

    /// Shortest displacement from `from` to `to` on the torus
    pub fn delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        Vec2::new(
            shortest_axis(to.x - from.x, self.width),
            shortest_axis(to.y - from.y, self.height),
        )
    }

    /// Wrapped distance between two points
    pub fn distance(&self, a: Vec2, b: Vec2) -> f32 {
        self.delta(a, b).length()
    }

    /// Scale normalized (0..1) coordinates into canvas space
    pub fn from_normalized(&self, normalized: Vec2) -> Vec2 {
        normalized * self.size()
    }

    /// Uniform random point at least `margin` away from every edge.
    /// If the margin leaves no interior on an axis, that axis uses the center.
    pub fn random_interior<R: GameRng>(&self, margin: f32, rng: &mut R) -> Vec2 {
        let margin = margin.max(0.0);
        Vec2::new(
            rng.gen_range_f32(margin.min(self.width * 0.5), self.width - margin),
            rng.gen_range_f32(margin.min(self.height * 0.5), self.height - margin),
        )
    }
}

fn wrap_axis(value: f32, bound: f32) -> f32 {
    if bound <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(bound);
    // rem_euclid can round tiny negatives up to exactly `bound`
    if wrapped >= bound { 0.0 } else { wrapped }
}

fn shortest_axis(d: f32, bound: f32) -> f32 {
    if bound <= 0.0 {
        return d;
    }
    let half = bound * 0.5;
    if d > half {
        d - bound
    } else if d < -half {
        d + bound
    } else {
        d
    }
}
