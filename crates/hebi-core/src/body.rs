//! Body propagation via spacing relaxation
//!
//! Each trailing segment, nearest the head first, is pulled toward its
//! already-updated predecessor until it sits at most `segment_spacing` away.
//! Segments closer than the spacing are left alone, so freshly grown segments
//! (stacked on the tail) fan out over the following ticks instead of popping
//! into place.

use glam::Vec2;

use crate::arena::Arena;
use crate::config::BodyConfig;
use crate::segment::SegmentChain;

/// Chain relaxation and growth
#[derive(Debug, Clone)]
pub struct BodyChain {
    config: BodyConfig,
}

impl BodyChain {
    pub fn new(config: BodyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    /// Fresh chain for a new game
    pub fn spawn(&self, head: Vec2, heading: Vec2) -> SegmentChain {
        SegmentChain::straight(
            head,
            heading,
            self.config.initial_length,
            self.config.segment_spacing,
        )
    }

    /// Move the head to `new_head` and relax every trailing segment once
    pub fn relax(&self, chain: &mut SegmentChain, new_head: Vec2, arena: &Arena) {
        chain.set_head(new_head);

        let spacing = self.config.segment_spacing;
        let mut ahead: Option<Vec2> = None;
        for position in chain.positions_mut() {
            if let Some(predecessor) = ahead {
                // Shortest path so a body straddling an edge stays contiguous
                let to_predecessor = arena.delta(*position, predecessor);
                let distance = to_predecessor.length();
                if distance > spacing {
                    let pull = (distance - spacing) / distance;
                    *position = arena.wrap(*position + to_predecessor * pull);
                }
            }
            ahead = Some(*position);
        }
    }

    /// Append the configured number of segments at the tail
    pub fn grow(&self, chain: &mut SegmentChain) {
        chain.extend_at_tail(self.config.growth_segments);
    }
}
