//! The 2D drawing interface the renderers target.

use pluck_core::Point;

// ════════════════════════════════════════════════════════════════════════════
// Colors and strokes
// ════════════════════════════════════════════════════════════════════════════

/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity 0.0–1.0.
    pub a: f32,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self { Rgba { r, g, b, a: 1.0 } }

    pub fn with_alpha(self, a: f32) -> Self { Rgba { a: a.clamp(0.0, 1.0), ..self } }

    /// Packed 0xAARRGGBB.
    pub fn to_argb(self) -> u32 {
        let a = (self.a.clamp(0.0, 1.0) * 255.0).round() as u32;
        (a << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn from_argb(argb: u32) -> Self {
        Rgba {
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
            a: ((argb >> 24) & 0xFF) as f32 / 255.0,
        }
    }
}

/// Line styling.  `glow` is a blur radius in pixels drawn around the line
/// in the same color; 0 disables it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f32,
    pub glow:  f32,
}

impl Stroke {
    pub const fn new(color: Rgba, width: f32) -> Self { Stroke { color, width, glow: 0.0 } }

    pub fn with_glow(mut self, glow: f32) -> Self {
        self.glow = glow;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Surface
// ════════════════════════════════════════════════════════════════════════════

/// A pixel-coordinate drawing target.
pub trait Surface {
    /// Width and height in pixels.
    fn size(&self) -> (f32, f32);

    fn clear(&mut self, color: Rgba);

    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke);

    /// Open polyline through `points`.
    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba);
}

// ════════════════════════════════════════════════════════════════════════════
// RecordingSurface
// ════════════════════════════════════════════════════════════════════════════

/// One recorded [`Surface`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clear(Rgba),
    Line { from: Point, to: Point, stroke: Stroke },
    Path { points: Vec<Point>, stroke: Stroke },
    Circle { center: Point, radius: f32, color: Rgba },
}

/// A surface that draws nothing and remembers every call.
#[derive(Debug)]
pub struct RecordingSurface {
    pub width:  f32,
    pub height: f32,
    pub calls:  Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        RecordingSurface { width, height, calls: Vec::new() }
    }

    pub fn paths(&self) -> impl Iterator<Item = (&[Point], &Stroke)> {
        self.calls.iter().filter_map(|c| match c {
            DrawCall::Path { points, stroke } => Some((points.as_slice(), stroke)),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = (Point, Point, &Stroke)> {
        self.calls.iter().filter_map(|c| match c {
            DrawCall::Line { from, to, stroke } => Some((*from, *to, stroke)),
            _ => None,
        })
    }

    pub fn reset(&mut self) { self.calls.clear(); }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) { (self.width, self.height) }

    fn clear(&mut self, color: Rgba) { self.calls.push(DrawCall::Clear(color)); }

    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        self.calls.push(DrawCall::Line { from, to, stroke: *stroke });
    }

    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke) {
        self.calls.push(DrawCall::Path { points: points.to_vec(), stroke: *stroke });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        self.calls.push(DrawCall::Circle { center, radius, color });
    }
}
