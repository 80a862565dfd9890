//! The per-frame step: extract → detect → spawn → advance, then draw.
//!
//! [`StringPipeline`] holds all frame-to-frame state (plucker history and
//! the live ripples).  It has no clock and no devices, so tests drive it
//! with synthetic frames in sequence.

use tracing::debug;

use pluck_core::{
    extract, AnchorPair, CrossingDetector, Extraction, ExtractorConfig, HandFrame, PluckEvent,
    SurfaceSize,
};
use ripple_field::{RippleConfig, RippleField, Rgba, Stroke, Surface};

// ════════════════════════════════════════════════════════════════════════════
// Configuration
// ════════════════════════════════════════════════════════════════════════════

/// How the string between the anchors is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StringStyle {
    pub color: Rgba,
    pub width: f32,
    pub glow:  f32,
}

impl Default for StringStyle {
    fn default() -> Self {
        StringStyle { color: Rgba::rgb(0xFF, 0xFF, 0xFF), width: 4.0, glow: 15.0 }
    }
}

impl StringStyle {
    pub fn stroke(&self) -> Stroke { Stroke::new(self.color, self.width).with_glow(self.glow) }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    pub extractor:  ExtractorConfig,
    pub string:     StringStyle,
    pub ripples:    RippleConfig,
    pub background: Rgba,
    /// Dot radius drawn at each plucker; 0 hides them.
    pub plucker_radius: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            extractor:      ExtractorConfig::default(),
            string:         StringStyle::default(),
            ripples:        RippleConfig::default(),
            background:     Rgba::rgb(0x0B, 0x0D, 0x17),
            plucker_radius: 5.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameOutput
// ════════════════════════════════════════════════════════════════════════════

/// What one update produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameOutput {
    /// The string this frame, if two hands are present.
    pub anchors:      Option<AnchorPair>,
    /// Plucks to sound, in slot order.
    pub plucks:       Vec<PluckEvent>,
    /// Ripples alive after this frame's advance.
    pub live_ripples: usize,
}

// ════════════════════════════════════════════════════════════════════════════
// StringPipeline
// ════════════════════════════════════════════════════════════════════════════

pub struct StringPipeline {
    size:       SurfaceSize,
    config:     PipelineConfig,
    detector:   CrossingDetector,
    ripples:    RippleField,
    /// Result of the newest detection, kept for drawing.
    current:    Extraction,
    frames:     u64,
}

impl StringPipeline {
    pub fn new(size: SurfaceSize, config: PipelineConfig) -> Self {
        Self::with_field(size, config, RippleField::new(config.ripples))
    }

    /// Deterministic ripple ids.
    pub fn with_seed(size: SurfaceSize, config: PipelineConfig, seed: u64) -> Self {
        Self::with_field(size, config, RippleField::with_seed(config.ripples, seed))
    }

    fn with_field(size: SurfaceSize, config: PipelineConfig, ripples: RippleField) -> Self {
        StringPipeline {
            size,
            config,
            detector: CrossingDetector::new(),
            ripples,
            current:  Extraction::default(),
            frames:   0,
        }
    }

    pub fn size(&self) -> SurfaceSize { self.size }
    pub fn config(&self) -> &PipelineConfig { &self.config }
    pub fn ripples(&self) -> &RippleField { &self.ripples }
    pub fn detector(&self) -> &CrossingDetector { &self.detector }
    pub fn frames(&self) -> u64 { self.frames }

    /// One display frame with at most one new detection.
    ///
    /// `Some(frame)` is a fresh detection: pluckers are tested against the
    /// string and history moves forward.  `None` means the tracker had
    /// nothing new; history and the drawn string are left as they were.
    /// Ripples advance exactly once either way.
    pub fn update(&mut self, frame: Option<&HandFrame>) -> FrameOutput {
        self.step(frame)
    }

    /// One display frame covering every detection the tracker finished
    /// since the last one, oldest first.  Each detection is tested against
    /// the one before it, so no crossing in between is lost; ripples still
    /// advance once.
    pub fn update_batch(&mut self, frames: &[HandFrame]) -> FrameOutput {
        self.step(frames)
    }

    fn step<'a>(&mut self, frames: impl IntoIterator<Item = &'a HandFrame>) -> FrameOutput {
        // Existing ripples age first; new ones are drawn at full life.
        self.ripples.advance();

        let mut plucks = Vec::new();
        for frame in frames {
            plucks.extend(self.detect(frame));
        }
        self.frames += 1;

        if !plucks.is_empty() {
            debug!(frame = self.frames, plucks = plucks.len(), live = self.ripples.len(), "frame plucked");
        }
        FrameOutput { anchors: self.current.anchors, plucks, live_ripples: self.ripples.len() }
    }

    /// Extract, test for crossings and spawn a ripple at each pluck.
    fn detect(&mut self, frame: &HandFrame) -> Vec<PluckEvent> {
        self.current = extract(frame, self.size, &self.config.extractor);
        let plucks = self.detector.detect(&self.current, self.size);
        for ev in &plucks {
            self.ripples.spawn(ev.point.x, ev.point.y);
        }
        plucks
    }

    /// A new surface size; history is dropped since old pixels no longer
    /// line up.
    pub fn resize(&mut self, size: SurfaceSize) {
        if size != self.size {
            self.size = size;
            self.detector.reset();
            self.current = Extraction::default();
        }
    }

    /// Forget hands and ripples.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.ripples.clear();
        self.current = Extraction::default();
    }

    /// Clear, then draw the string, pluckers and ripples.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear(self.config.background);

        if let Some(AnchorPair { a, b }) = self.current.anchors {
            surface.draw_line(a, b, &self.config.string.stroke());
        }
        if self.config.plucker_radius > 0.0 {
            let dot = self.config.string.color.with_alpha(0.6);
            for p in &self.current.pluckers {
                surface.fill_circle(*p, self.config.plucker_radius, dot);
            }
        }
        self.ripples.render(surface);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
