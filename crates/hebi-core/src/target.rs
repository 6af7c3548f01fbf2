//! Target resolution: tracked signal vs. autonomous wander
//!
//! A signal younger than the liveness window wins. Otherwise the snake
//! patrols: it heads for a random wander point that is re-rolled with a small
//! per-tick probability. Source changes are reported once per change, never
//! repeated while the source stays the same.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::arena::Arena;
use crate::config::TrackingConfig;
use crate::rng::GameRng;
use crate::signal::FingerSignal;

/// Where the current target came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSource {
    Tracked,
    Wander,
}

/// The steering goal for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    /// Canvas-space position
    pub position: Vec2,
    pub source: TargetSource,
    /// Signal time for tracked targets, resolution time for wander
    pub timestamp: Instant,
}

/// Observable change of target source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTransition {
    /// A fresh signal took over steering
    Acquired,
    /// The signal went stale; wander took over
    Lost,
}

/// Output of [`TargetResolver::resolve`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetResolution {
    pub target: Target,
    pub transition: Option<SourceTransition>,
}

/// Merges the tracked signal with the wander fallback
#[derive(Debug, Clone)]
pub struct TargetResolver {
    config: TrackingConfig,
    wander_target: Option<Vec2>,
    last_source: Option<TargetSource>,
}

impl TargetResolver {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            wander_target: None,
            last_source: None,
        }
    }

    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.config.liveness_timeout_ms)
    }

    /// Source reported on the previous call, if any
    pub fn last_source(&self) -> Option<TargetSource> {
        self.last_source
    }

    pub fn wander_target(&self) -> Option<Vec2> {
        self.wander_target
    }

    /// Forget wander state and transition history (new game)
    pub fn reset(&mut self) {
        self.wander_target = None;
        self.last_source = None;
    }

    /// True when `signal` is still inside the liveness window at `now`
    pub fn is_live(&self, signal: &FingerSignal, now: Instant) -> bool {
        signal.age(now) < self.liveness()
    }

    /// Map a normalized signal into canvas space, mirroring x if configured
    pub fn to_canvas(&self, signal: &FingerSignal, arena: &Arena) -> Vec2 {
        let mut normalized = signal.normalized();
        if self.config.mirror_x {
            normalized.x = 1.0 - normalized.x;
        }
        arena.from_normalized(normalized)
    }

    /// Resolve this tick's target
    pub fn resolve<R: GameRng>(
        &mut self,
        signal: Option<&FingerSignal>,
        now: Instant,
        arena: &Arena,
        rng: &mut R,
    ) -> TargetResolution {
        let target = match signal.filter(|s| self.is_live(s, now)) {
            Some(signal) => Target {
                position: self.to_canvas(signal, arena),
                source: TargetSource::Tracked,
                timestamp: signal.timestamp,
            },
            None => Target {
                position: self.wander(arena, rng),
                source: TargetSource::Wander,
                timestamp: now,
            },
        };

        let transition = match (self.last_source, target.source) {
            (Some(TargetSource::Tracked), TargetSource::Wander) => Some(SourceTransition::Lost),
            (Some(TargetSource::Wander) | None, TargetSource::Tracked) => {
                Some(SourceTransition::Acquired)
            }
            _ => None,
        };
        self.last_source = Some(target.source);

        TargetResolution { target, transition }
    }

    fn wander<R: GameRng>(&mut self, arena: &Arena, rng: &mut R) -> Vec2 {
        let resample = self.wander_target.is_none()
            || rng.check_probability(self.config.wander_resample_chance);
        if resample {
            let point = arena.random_interior(0.0, rng);
            log::trace!("New wander target ({:.0}, {:.0})", point.x, point.y);
            self.wander_target = Some(point);
            return point;
        }
        self.wander_target.unwrap_or_else(|| arena.center())
    }
}
