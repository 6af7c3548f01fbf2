//! Segment chain data model
//!
//! `chain[0]` is the head. Segments keep their [`SegmentId`] for the whole
//! game; the chain only ever grows at the tail until it is rebuilt on reset.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identity of one body segment within a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(u32);

impl SegmentId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Segment({})", self.0)
    }
}

/// One body segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub position: Vec2,
}

/// Ordered body, head first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentChain {
    segments: Vec<Segment>,
    next_id: u32,
}

impl SegmentChain {
    /// Lay out `length` segments in a straight line from `head`, trailing
    /// opposite to `heading`, `spacing` apart. A zero length still yields a head.
    pub fn straight(head: Vec2, heading: Vec2, length: usize, spacing: f32) -> Self {
        let back = -heading.try_normalize().unwrap_or(Vec2::X);
        let mut chain = Self {
            segments: Vec::with_capacity(length.max(1)),
            next_id: 0,
        };
        for i in 0..length.max(1) {
            chain.push(head + back * spacing * i as f32);
        }
        chain
    }

    /// Build a chain from explicit positions (head first)
    pub fn from_positions(positions: impl IntoIterator<Item = Vec2>) -> Self {
        let mut chain = Self {
            segments: Vec::new(),
            next_id: 0,
        };
        for p in positions {
            chain.push(p);
        }
        chain
    }

    fn push(&mut self, position: Vec2) {
        self.segments.push(Segment {
            id: SegmentId(self.next_id),
            position,
        });
        self.next_id += 1;
    }

    /// Append `count` segments coincident with the current tail
    pub fn extend_at_tail(&mut self, count: usize) {
        let Some(tail) = self.tail() else {
            return;
        };
        self.segments.reserve(count);
        for _ in 0..count {
            self.push(tail);
        }
    }

    pub fn head(&self) -> Vec2 {
        self.segments.first().map(|s| s.position).unwrap_or(Vec2::ZERO)
    }

    pub fn tail(&self) -> Option<Vec2> {
        self.segments.last().map(|s| s.position)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Positions only, head first (for rendering and tests)
    pub fn positions(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.segments.iter().map(|s| s.position)
    }

    /// Mutable positions; identity and length are not reachable through this
    pub(crate) fn positions_mut(&mut self) -> impl Iterator<Item = &mut Vec2> + '_ {
        self.segments.iter_mut().map(|s| &mut s.position)
    }

    pub(crate) fn set_head(&mut self, position: Vec2) {
        if let Some(head) = self.segments.first_mut() {
            head.position = position;
        }
    }
}

impl std::ops::Index<usize> for SegmentChain {
    type Output = Segment;

    fn index(&self, index: usize) -> &Segment {
        &self.segments[index]
    }
}
