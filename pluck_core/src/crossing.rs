//! Frame-to-frame crossing detection.
//!
//! A plucker plucks the string when the segment it travelled since the
//! previous frame properly crosses the segment between the two anchors.

use tracing::debug;

use crate::geometry::{Point, segments_intersect};
use crate::landmarks::{Extraction, SurfaceSize};

// ════════════════════════════════════════════════════════════════════════════
// PluckEvent
// ════════════════════════════════════════════════════════════════════════════

/// A detected crossing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PluckEvent {
    /// Detection slot of the hand whose plucker crossed.
    pub slot:  usize,
    /// Plucker position on the frame the crossing was seen.
    pub point: Point,
    /// `point.x / surface width`: horizontal position on screen, not a
    /// projection onto the string.
    pub normalized_position: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// PluckerState
// ════════════════════════════════════════════════════════════════════════════

/// Last-known plucker positions, keyed by detection slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PluckerState {
    positions: Vec<Point>,
}

impl PluckerState {
    pub fn get(&self, slot: usize) -> Option<Point> { self.positions.get(slot).copied() }
    pub fn len(&self) -> usize { self.positions.len() }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }
    pub fn clear(&mut self) { self.positions.clear(); }

    fn replace_with(&mut self, current: &[Point]) {
        self.positions.clear();
        self.positions.extend_from_slice(current);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CrossingDetector
// ════════════════════════════════════════════════════════════════════════════

/// Tracks each plucker's previous position and reports crossings.
#[derive(Debug, Default)]
pub struct CrossingDetector {
    history: PluckerState,
}

impl CrossingDetector {
    pub fn new() -> Self { Self::default() }

    /// Positions that the next frame will be tested against.
    pub fn history(&self) -> &PluckerState { &self.history }

    /// Forget all previous positions.
    pub fn reset(&mut self) { self.history.clear(); }

    /// Test this frame's pluckers against the previous frame's.
    ///
    /// Without a full anchor pair no tests run and the history is dropped,
    /// so a hand re-entering the frame elsewhere cannot fire a pluck from
    /// its stale position.
    pub fn detect(&mut self, frame: &Extraction, size: SurfaceSize) -> Vec<PluckEvent> {
        let Some(anchors) = frame.anchors else {
            if !self.history.is_empty() {
                debug!(slots = self.history.len(), "string released, plucker history cleared");
            }
            self.history.clear();
            return Vec::new();
        };

        let mut events = Vec::new();
        for (slot, &current) in frame.pluckers.iter().enumerate() {
            let Some(prev) = self.history.get(slot) else { continue };
            if segments_intersect(prev, current, anchors.a, anchors.b) {
                let normalized_position = current.x / size.width;
                debug!(slot, x = current.x, y = current.y, normalized_position, "pluck");
                events.push(PluckEvent { slot, point: current, normalized_position });
            }
        }

        self.history.replace_with(&frame.pluckers);
        events
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
