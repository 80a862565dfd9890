//! # pluck_core
//!
//! Frame-to-frame logic for a gesture-plucked "string": two tracked
//! fingertips hold the string taut, and any other tracked fingertip whose
//! motion crosses it plucks it.
//!
//! Everything here is synchronous and allocation-light.  One call per
//! processed camera frame:
//!
//! ```text
//!  HandFrame ──extract──▶ Extraction ──CrossingDetector::detect──▶ Vec<PluckEvent>
//!                         (anchors,       (compares against last frame's
//!                          pluckers)       plucker positions)
//! ```
//!
//! ## Roles by detection slot
//!
//! | Slot | Anchor | Plucker |
//! |---|---|---|
//! | hand 0 | primary tip → anchor A | secondary tip → plucker 0 |
//! | hand 1 | primary tip → anchor B | secondary tip → plucker 1 |
//! | hand 2.. | — | secondary tip → plucker n |
//!
//! Slots are positional: a hand keeps its slot only as long as the tracker
//! keeps reporting it in the same order.
//!
//! ## Quick start
//!
//! ```rust
//! use pluck_core::{extract, CrossingDetector, ExtractorConfig, SurfaceSize};
//! use pluck_core::landmarks::HandFrame;
//!
//! let size = SurfaceSize::new(640.0, 480.0);
//! let cfg = ExtractorConfig::default();
//! let mut detector = CrossingDetector::new();
//!
//! let frame = HandFrame::default();
//! let extraction = extract(&frame, size, &cfg);
//! let plucks = detector.detect(&extraction, size);
//! assert!(plucks.is_empty());
//! ```

pub mod geometry;
pub mod landmarks;
pub mod crossing;

pub use geometry::{Point, segments_intersect, distance, lerp};
pub use landmarks::{
    AnchorPair, Extraction, ExtractorConfig, Hand, HandFrame, Landmark, SurfaceSize, extract,
};
pub use crossing::{CrossingDetector, PluckEvent, PluckerState};
