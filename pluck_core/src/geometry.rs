//! Pixel-space points and the segment-crossing test.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Point
// ════════════════════════════════════════════════════════════════════════════

/// A position on the rendering surface, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self { Point { x, y } }

    /// Point `t` of the way from `self` to `other` (unclamped).
    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(lerp(self.x, other.x, t), lerp(self.y, other.y, t))
    }

    pub fn distance_to(self, other: Point) -> f32 { distance(self, other) }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self { Point::new(x, y) }
}

// ════════════════════════════════════════════════════════════════════════════
// Free functions
// ════════════════════════════════════════════════════════════════════════════

/// True iff segment `p1–p2` properly crosses segment `p3–p4`.
///
/// Both parametric fractions must lie strictly inside `(0, 1)`, so touching
/// at an endpoint is not a crossing.  Parallel and collinear segments
/// (`det == 0`) never intersect, even when they overlap.  `NaN` input yields
/// `false` through ordinary IEEE comparison.
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let det = (p2.x - p1.x) * (p4.y - p3.y) - (p4.x - p3.x) * (p2.y - p1.y);
    if det == 0.0 {
        return false;
    }

    // fraction along p1–p2
    let gamma = ((p4.y - p3.y) * (p4.x - p1.x) + (p3.x - p4.x) * (p4.y - p1.y)) / det;
    // fraction along p3–p4
    let lambda = ((p1.y - p2.y) * (p4.x - p1.x) + (p2.x - p1.x) * (p4.y - p1.y)) / det;

    0.0 < gamma && gamma < 1.0 && 0.0 < lambda && lambda < 1.0
}

/// Euclidean distance.
pub fn distance(p1: Point, p2: Point) -> f32 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Linear interpolation; `t` is not clamped.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: f32, y: f32) -> Point { Point::new(x, y) }

    // ── segments_intersect ────────────────────────────────────────────────
    #[test]
    fn perpendicular_crossing() {
        assert!(segments_intersect(p(50.0, -10.0), p(50.0, 10.0), p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn stays_on_one_side() {
        assert!(!segments_intersect(p(50.0, -10.0), p(50.0, -1.0), p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn endpoint_touch_is_not_a_crossing() {
        // arriving exactly on anchor A
        assert!(!segments_intersect(p(0.0, -10.0), p(0.0, 0.0), p(0.0, 0.0), p(100.0, 0.0)));
        // landing on the string interior from above
        assert!(!segments_intersect(p(50.0, -10.0), p(50.0, 0.0), p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn passes_beyond_string_end() {
        assert!(!segments_intersect(p(150.0, -10.0), p(150.0, 10.0), p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn parallel_segments_never_intersect() {
        assert!(!segments_intersect(p(0.0, 1.0), p(100.0, 1.0), p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn identical_overlapping_segments_never_intersect() {
        let a = p(10.0, 10.0);
        let b = p(90.0, 50.0);
        assert!(!segments_intersect(a, b, a, b));
        assert!(!segments_intersect(p(0.0, 0.0), p(60.0, 0.0), p(40.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn degenerate_point_segment() {
        let q = p(50.0, 0.0);
        assert!(!segments_intersect(q, q, p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn nan_is_false() {
        assert!(!segments_intersect(p(f32::NAN, -10.0), p(50.0, 10.0), p(0.0, 0.0), p(100.0, 0.0)));
    }

    #[test]
    fn diagonal_string() {
        // string from (0,0) to (100,100); plucker crosses it near the middle
        assert!(segments_intersect(p(60.0, 40.0), p(40.0, 60.0), p(0.0, 0.0), p(100.0, 100.0)));
    }

    // ── distance / lerp ──────────────────────────────────────────────────
    #[test]
    fn distance_3_4_5() {
        assert_eq!(distance(p(0.0, 0.0), p(3.0, 4.0)), 5.0);
    }

    #[test]
    fn lerp_is_unclamped() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(0.0, 10.0, 1.5), 15.0);
        assert_eq!(lerp(0.0, 10.0, -1.0), -10.0);
    }

    #[test]
    fn point_lerp_midpoint() {
        assert_eq!(p(0.0, 0.0).lerp(p(10.0, 20.0), 0.5), p(5.0, 10.0));
    }

    // ── properties ───────────────────────────────────────────────────────
    fn coord() -> impl Strategy<Value = f32> { -1000.0f32..1000.0 }

    fn point() -> impl Strategy<Value = Point> { (coord(), coord()).prop_map(Point::from) }

    proptest! {
        #[test]
        fn symmetric_under_role_swap(a in point(), b in point(), c in point(), d in point()) {
            prop_assert_eq!(segments_intersect(a, b, c, d), segments_intersect(c, d, a, b));
        }

        #[test]
        fn symmetric_under_direction_reversal(a in point(), b in point(), c in point(), d in point()) {
            prop_assert_eq!(segments_intersect(a, b, c, d), segments_intersect(b, a, d, c));
        }

        #[test]
        fn parallel_offsets_are_false(a in point(), b in point(), dx in coord(), dy in coord()) {
            let c = Point::new(a.x + dx, a.y + dy);
            let d = Point::new(b.x + dx, b.y + dy);
            prop_assert!(!segments_intersect(a, b, c, d));
        }
    }
}
