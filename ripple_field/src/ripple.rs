//! Ripple lifecycle and the spiral renderer.
//!
//! Each ripple lives for `max_age` frames.  Its *life* runs from 1.0 at
//! spawn down toward 0.0; opacity and stroke width follow life, while the
//! spiral's rotation, curl and radius grow with age.

use std::f32::consts::TAU;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use pluck_core::Point;

use crate::surface::{Rgba, Stroke, Surface};

// ════════════════════════════════════════════════════════════════════════════
// Configuration
// ════════════════════════════════════════════════════════════════════════════

/// Spiral appearance.  Cosmetic; only the fade-out contract matters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpiralStyle {
    pub color:         Rgba,
    pub arms:          usize,
    /// Points per arm.
    pub segments:      usize,
    /// Radians of rotation per frame of age.
    pub spin:          f32,
    /// Turns each arm makes at age 0.
    pub curl_base:     f32,
    /// Extra turns per frame of age.
    pub curl_growth:   f32,
    pub radius_base:   f32,
    pub radius_growth: f32,
    /// Stroke width at full life.
    pub max_width:     f32,
    pub glow:          f32,
}

impl Default for SpiralStyle {
    fn default() -> Self {
        SpiralStyle {
            color:         Rgba::rgb(0x7F, 0xE7, 0xFF),
            arms:          5,
            segments:      32,
            spin:          0.06,
            curl_base:     0.15,
            curl_growth:   0.008,
            radius_base:   12.0,
            radius_growth: 2.2,
            max_width:     3.0,
            glow:          8.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RippleConfig {
    /// Frames a ripple stays alive.
    pub max_age: u32,
    pub spiral:  SpiralStyle,
}

impl Default for RippleConfig {
    fn default() -> Self {
        RippleConfig { max_age: 60, spiral: SpiralStyle::default() }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Ripple
// ════════════════════════════════════════════════════════════════════════════

/// Creation time plus a random tiebreaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RippleId {
    pub created_ms: u64,
    pub salt:       u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ripple {
    pub id:        RippleId,
    pub x:         f32,
    pub y:         f32,
    pub age:       u32,
    pub max_age:   u32,
    pub intensity: f32,
}

impl Ripple {
    /// `1 − age/max_age`; zero or below means the ripple is spent.
    pub fn life(&self) -> f32 {
        if self.max_age == 0 {
            return 0.0;
        }
        1.0 - self.age as f32 / self.max_age as f32
    }

    pub fn is_expired(&self) -> bool { self.age >= self.max_age }

    pub fn center(&self) -> Point { Point::new(self.x, self.y) }

    /// The spiral arms for this ripple's current age, one polyline each.
    pub fn spiral_arms(&self, style: &SpiralStyle) -> Vec<Vec<Point>> {
        let age = self.age as f32;
        let rotation = age * style.spin;
        let curl = style.curl_base + age * style.curl_growth;
        let radius = style.radius_base + age * style.radius_growth;
        let arms = style.arms.max(1);
        let segments = style.segments.max(2);

        (0..arms)
            .map(|arm| {
                let base = rotation + arm as f32 * TAU / arms as f32;
                (0..=segments)
                    .map(|s| {
                        let f = s as f32 / segments as f32;
                        let theta = base + f * curl * TAU;
                        let r = f * radius;
                        Point::new(self.x + r * theta.cos(), self.y + r * theta.sin())
                    })
                    .collect()
            })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RippleField
// ════════════════════════════════════════════════════════════════════════════

/// The live ripple set.  Self-limiting: every ripple expires.
#[derive(Debug)]
pub struct RippleField {
    ripples: Vec<Ripple>,
    config:  RippleConfig,
    rng:     SmallRng,
}

impl RippleField {
    pub fn new(config: RippleConfig) -> Self {
        RippleField { ripples: Vec::new(), config, rng: SmallRng::from_os_rng() }
    }

    /// Deterministic id tiebreakers.
    pub fn with_seed(config: RippleConfig, seed: u64) -> Self {
        RippleField { ripples: Vec::new(), config, rng: SmallRng::seed_from_u64(seed) }
    }

    pub fn config(&self) -> &RippleConfig { &self.config }
    pub fn len(&self) -> usize { self.ripples.len() }
    pub fn is_empty(&self) -> bool { self.ripples.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &Ripple> { self.ripples.iter() }
    pub fn clear(&mut self) { self.ripples.clear(); }

    /// Start a ripple at `(x, y)` and return its id.
    pub fn spawn(&mut self, x: f32, y: f32) -> RippleId {
        let created_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let id = loop {
            let candidate = RippleId { created_ms, salt: self.rng.random() };
            if !self.ripples.iter().any(|r| r.id == candidate) {
                break candidate;
            }
        };

        trace!(x, y, salt = id.salt, "ripple spawned");
        self.ripples.push(Ripple {
            id,
            x,
            y,
            age:       0,
            max_age:   self.config.max_age,
            intensity: 1.0,
        });
        id
    }

    /// Age every ripple by one frame and drop the expired ones.
    pub fn advance(&mut self) {
        for r in &mut self.ripples {
            r.age += 1;
        }
        let before = self.ripples.len();
        self.ripples.retain(|r| !r.is_expired());
        let expired = before - self.ripples.len();
        if expired > 0 {
            trace!(expired, live = self.ripples.len(), "ripples expired");
        }
    }

    /// Draw one spiral per ripple that still has life left.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        let style = &self.config.spiral;
        for ripple in &self.ripples {
            let life = ripple.life();
            if life <= 0.0 {
                continue;
            }
            let stroke = Stroke {
                color: style.color.with_alpha(life * ripple.intensity),
                width: style.max_width * life,
                glow:  style.glow * life,
            };
            for arm in ripple.spiral_arms(style) {
                surface.stroke_path(&arm, &stroke);
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
