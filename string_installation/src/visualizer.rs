//! Software-rendered window using `minifb`.
//!
//! [`Canvas`] is an ARGB framebuffer that implements the ripple crate's
//! [`Surface`], so the same draw calls that tests record end up as pixels
//! here.  [`Visualizer`] puts a canvas in a window and reads the two keys
//! the installation listens to.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                                                          │
//! │        ●━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━●           │
//! │                    ✺ ripple                              │
//! │                                                          │
//! │                PRESS SPACE TO START                      │
//! │                                                          │
//! │  status bar                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use pluck_core::{distance, Point};
use ripple_field::{Rgba, Stroke, Surface};

use crate::InstallationError;

// ════════════════════════════════════════════════════════════════════════════
// Look
// ════════════════════════════════════════════════════════════════════════════

/// Peak opacity of a glow halo relative to the stroke.
const GLOW_STRENGTH: f32 = 0.35;
const STATUS_BG:     u32 = 0xFF0F1A30;
const STATUS_FG:     u32 = 0xFFE0E0E0;
const LEGEND_FG:     u32 = 0xFF808080;
const PROMPT_FG:     u32 = 0xFFFFD700;
const STATUS_H:      usize = 28;

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// Opaque ARGB pixel buffer, row-major.
#[derive(Clone, Debug)]
pub struct Canvas {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, buf: vec![0xFF00_0000; width * height] }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height { Some(self.buf[y * self.width + x]) } else { None }
    }

    /// Composite `color` over one pixel with extra `coverage` (0.0–1.0).
    fn blend_pixel(&mut self, x: isize, y: isize, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let alpha = color.a * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        let src = color.with_alpha(1.0).to_argb();
        self.buf[idx] = blend(self.buf[idx], src, alpha);
    }

    /// Clamp a float box to pixel indices; `None` when it misses the canvas
    /// or is not finite.
    fn pixel_box(&self, min: Point, max: Point) -> Option<(isize, isize, isize, isize)> {
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return None;
        }
        let x0 = (min.x.floor() as isize).max(0);
        let y0 = (min.y.floor() as isize).max(0);
        let x1 = (max.x.ceil() as isize).min(self.width as isize - 1);
        let y1 = (max.y.ceil() as isize).min(self.height as isize - 1);
        if x0 > x1 || y0 > y1 { None } else { Some((x0, y0, x1, y1)) }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    /// 3×5 bitmap text, each font pixel drawn as a `scale`×`scale` block.
    pub fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            if cx + 3 * scale > self.width { break; }
            for (row, &bits) in char_glyph(ch).iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
        }
    }
}

/// Width in pixels of `text` drawn at `scale`.
pub fn text_width(text: &str, scale: usize) -> usize {
    let n = text.chars().count();
    if n == 0 { 0 } else { (n * 4 - 1) * scale.max(1) }
}

impl Surface for Canvas {
    fn size(&self) -> (f32, f32) { (self.width as f32, self.height as f32) }

    fn clear(&mut self, color: Rgba) {
        let argb = 0xFF00_0000 | color.to_argb();
        self.buf.fill(argb);
    }

    /// Anti-aliased thick line with an optional quadratic glow halo.
    fn draw_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        let half = stroke.width.max(0.0) / 2.0;
        let glow = stroke.glow.max(0.0);
        let reach = half + glow + 1.0;
        let min = Point::new(from.x.min(to.x) - reach, from.y.min(to.y) - reach);
        let max = Point::new(from.x.max(to.x) + reach, from.y.max(to.y) + reach);
        let Some((x0, y0, x1, y1)) = self.pixel_box(min, max) else { return };

        for y in y0..=y1 {
            for x in x0..=x1 {
                let c = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                let d = segment_distance(c, from, to);
                let core = (half + 0.5 - d).clamp(0.0, 1.0);
                let halo = if glow > 0.0 && d > half {
                    let t = 1.0 - (d - half) / glow;
                    if t > 0.0 { GLOW_STRENGTH * t * t } else { 0.0 }
                } else {
                    0.0
                };
                let coverage = core.max(halo);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, stroke.color, coverage);
                }
            }
        }
    }

    fn stroke_path(&mut self, points: &[Point], stroke: &Stroke) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], stroke);
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba) {
        let r = radius.max(0.0);
        let min = Point::new(center.x - r - 1.0, center.y - r - 1.0);
        let max = Point::new(center.x + r + 1.0, center.y + r + 1.0);
        let Some((x0, y0, x1, y1)) = self.pixel_box(min, max) else { return };

        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = distance(Point::new(x as f32 + 0.5, y as f32 + 0.5), center);
                let coverage = (r + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, color, coverage);
                }
            }
        }
    }
}

/// Distance from `p` to the segment `a`–`b`.
fn segment_distance(p: Point, a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

// ════════════════════════════════════════════════════════════════════════════
// Overlay
// ════════════════════════════════════════════════════════════════════════════

/// Start prompt (until audio is running) and the bottom status bar.
pub fn draw_overlay(canvas: &mut Canvas, started: bool, status: &str) {
    let (w, h) = (canvas.width(), canvas.height());

    if !started {
        let prompt = "PRESS SPACE TO START";
        let scale = 4;
        let x = w.saturating_sub(text_width(prompt, scale)) / 2;
        let y = h.saturating_sub(5 * scale) / 2;
        canvas.draw_text(prompt, x, y, scale, PROMPT_FG);
    }

    let bar_y = h.saturating_sub(STATUS_H);
    canvas.fill_rect(0, bar_y, w, STATUS_H, STATUS_BG);
    canvas.draw_text(status, 10, bar_y + 4, 2, STATUS_FG);

    let legend = "SPACE=START  ESC/Q=QUIT";
    let lx = w.saturating_sub(text_width(legend, 1) + 10);
    canvas.draw_text(legend, lx, bar_y + 18, 1, LEGEND_FG);
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// Keys seen since the last poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    /// Space: the user action that is allowed to start audio.
    pub start: bool,
    pub quit:  bool,
}

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
}

impl Visualizer {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, InstallationError> {
        let mut window = Window::new(
            title,
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| InstallationError::Window(e.to_string()))?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer { window, canvas: Canvas::new(width, height) })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    pub fn poll_input(&self) -> InputState {
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        InputState {
            start: one_shot(Key::Space),
            quit:  one_shot(Key::Escape) || one_shot(Key::Q),
        }
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas { &mut self.canvas }

    /// Push the canvas to the window and pump its events.
    pub fn present(&mut self) -> Result<(), InstallationError> {
        let (w, h) = (self.canvas.width(), self.canvas.height());
        self.window
            .update_with_buffer(self.canvas.pixels(), w, h)
            .map_err(|e| InstallationError::Window(e.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
