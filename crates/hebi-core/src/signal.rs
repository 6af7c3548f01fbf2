//! Tracked fingertip signal
//!
//! Coordinates are normalized to the camera frame (0..1 on both axes) exactly
//! as reported by the tracker; mirroring and canvas scaling happen in the
//! target resolver.

use glam::Vec2;
use web_time::Instant;

/// Latest fingertip position reported by the vision session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerSignal {
    pub x: f32,
    pub y: f32,
    pub timestamp: Instant,
}

impl FingerSignal {
    /// Build a signal from raw tracker output.
    ///
    /// Non-finite coordinates are rejected; finite values outside 0..1 are
    /// clamped onto the frame edge.
    pub fn new(x: f32, y: f32, timestamp: Instant) -> Option<Self> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            timestamp,
        })
    }

    pub fn normalized(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Age relative to `now` (zero if `now` is earlier)
    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.timestamp)
    }
}
