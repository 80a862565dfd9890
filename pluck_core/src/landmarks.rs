//! Hand-landmark input and the anchor/plucker extraction policy.
//!
//! The tracker reports every hand as 21 normalised landmarks (0.0–1.0 of
//! the camera image).  Only two indices matter here: the *primary* tip,
//! which becomes an end of the string, and the *secondary* tip, which
//! plucks it.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Number of landmarks per tracked hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices in the 21-point hand layout.
pub mod index {
    pub const WRIST:             usize = 0;
    pub const THUMB_CMC:         usize = 1;
    pub const THUMB_MCP:         usize = 2;
    pub const THUMB_IP:          usize = 3;
    pub const THUMB_TIP:         usize = 4;
    pub const INDEX_FINGER_MCP:  usize = 5;
    pub const INDEX_FINGER_PIP:  usize = 6;
    pub const INDEX_FINGER_DIP:  usize = 7;
    pub const INDEX_FINGER_TIP:  usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP:   usize = 13;
    pub const RING_FINGER_PIP:   usize = 14;
    pub const RING_FINGER_DIP:   usize = 15;
    pub const RING_FINGER_TIP:   usize = 16;
    pub const PINKY_MCP:         usize = 17;
    pub const PINKY_PIP:         usize = 18;
    pub const PINKY_DIP:         usize = 19;
    pub const PINKY_TIP:         usize = 20;
}

// ════════════════════════════════════════════════════════════════════════════
// Input types
// ════════════════════════════════════════════════════════════════════════════

/// One landmark, normalised to the camera image (`x`, `y` in 0.0–1.0).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self { Landmark { x, y, z: 0.0 } }
}

/// A single detected hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    /// "Left" / "Right" when the tracker reports it.  Not used for slotting.
    #[serde(default)]
    pub handedness: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

impl Hand {
    /// A hand whose every landmark sits at `(x, y)`.
    pub fn uniform(x: f32, y: f32) -> Self {
        Hand {
            landmarks:  [Landmark::new(x, y); LANDMARK_COUNT],
            handedness: None,
            score:      None,
        }
    }

    /// Builder: move one landmark.
    pub fn with_landmark(mut self, idx: usize, x: f32, y: f32) -> Self {
        if let Some(lm) = self.landmarks.get_mut(idx) {
            lm.x = x;
            lm.y = y;
        }
        self
    }

    /// Landmark `idx` scaled into pixel space.
    pub fn tip(&self, idx: usize, size: SurfaceSize) -> Option<Point> {
        self.landmarks.get(idx).map(|lm| size.scale(lm.x, lm.y))
    }
}

/// Every hand detected in one processed camera frame, in detection order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    pub hands: Vec<Hand>,
}

impl HandFrame {
    pub fn new(hands: Vec<Hand>) -> Self { HandFrame { hands } }

    pub fn len(&self) -> usize { self.hands.len() }
    pub fn is_empty(&self) -> bool { self.hands.is_empty() }

    /// Parse one JSON-lines record: `{"hands":[{"landmarks":[{"x":..,"y":..},..]}]}`.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Pixel dimensions of the rendering surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSize {
    pub width:  f32,
    pub height: f32,
}

impl SurfaceSize {
    pub const fn new(width: f32, height: f32) -> Self { SurfaceSize { width, height } }

    /// Normalised → pixel coordinates.
    pub fn scale(self, nx: f32, ny: f32) -> Point {
        Point::new(nx * self.width, ny * self.height)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Extraction
// ════════════════════════════════════════════════════════════════════════════

/// Which landmark plays which role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub anchor_landmark:  usize,
    pub plucker_landmark: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            anchor_landmark:  index::INDEX_FINGER_TIP,
            plucker_landmark: index::THUMB_TIP,
        }
    }
}

/// The two ends of the string for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorPair {
    pub a: Point,
    pub b: Point,
}

/// Result of [`extract`]: optional string plus one plucker per hand slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub anchors:  Option<AnchorPair>,
    /// `pluckers[i]` belongs to the hand in detection slot `i`.
    pub pluckers: Vec<Point>,
}

/// Split a frame into anchors and pluckers.
///
/// Hands 0 and 1 supply the anchors (only when both exist); every hand
/// supplies a plucker.  No smoothing or filtering is applied.
pub fn extract(frame: &HandFrame, size: SurfaceSize, cfg: &ExtractorConfig) -> Extraction {
    let mut anchor_a = None;
    let mut anchor_b = None;
    let mut pluckers = Vec::with_capacity(frame.hands.len());

    for (slot, hand) in frame.hands.iter().enumerate() {
        match slot {
            0 => anchor_a = hand.tip(cfg.anchor_landmark, size),
            1 => anchor_b = hand.tip(cfg.anchor_landmark, size),
            _ => {}
        }
        if let Some(p) = hand.tip(cfg.plucker_landmark, size) {
            pluckers.push(p);
        }
    }

    let anchors = match (anchor_a, anchor_b) {
        (Some(a), Some(b)) => Some(AnchorPair { a, b }),
        _ => None,
    };

    Extraction { anchors, pluckers }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
