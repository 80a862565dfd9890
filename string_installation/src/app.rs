//! Top-level application: configuration, the frame step, and the window
//! loop.
//!
//! [`Installation`] owns the pipeline, the audio engine and the optional
//! MIDI mirror.  [`run`] adds the window and the hand tracker around it and
//! drives one step per displayed frame.

use tracing::{info, warn};

use pluck_core::{HandFrame, SurfaceSize};
use pluck_synth::{AudioBackend, AudioEngine, AudioState, SynthSettings};

use crate::audio_out::DeviceBackend;
use crate::midi_mirror::{MidiMirror, MirrorSettings};
use crate::pipeline::{FrameOutput, PipelineConfig, StringPipeline};
use crate::tracker::{spawn_tracker, TrackerHandle, TrackerKind, TrackerPoll};
use crate::visualizer::{draw_overlay, Visualizer};
use crate::InstallationError;

// ════════════════════════════════════════════════════════════════════════════
// InstallationConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct InstallationConfig {
    pub title:     String,
    pub width:     usize,
    pub height:    usize,
    pub pipeline:  PipelineConfig,
    pub synth:     SynthSettings,
    pub tracker:   TrackerKind,
    /// MIDI port name fragment; `Some("")` picks a port automatically.
    pub midi_port: Option<String>,
    /// Start audio without waiting for the Space key.
    pub autostart: bool,
}

impl Default for InstallationConfig {
    fn default() -> Self {
        InstallationConfig {
            title:     "String Installation".to_string(),
            width:     1280,
            height:    720,
            pipeline:  PipelineConfig::default(),
            synth:     SynthSettings::default(),
            tracker:   TrackerKind::Scripted,
            midi_port: None,
            autostart: false,
        }
    }
}

impl InstallationConfig {
    pub fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width as f32, self.height as f32)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Installation
// ════════════════════════════════════════════════════════════════════════════

/// Everything that reacts to hand frames, minus window and tracker.
pub struct Installation<B: AudioBackend> {
    pipeline:     StringPipeline,
    audio:        AudioEngine<B>,
    midi:         Option<MidiMirror>,
    total_plucks: u64,
    last_hz:      Option<f32>,
}

impl<B: AudioBackend> Installation<B> {
    pub fn new(pipeline: StringPipeline, audio: AudioEngine<B>) -> Self {
        Installation { pipeline, audio, midi: None, total_plucks: 0, last_hz: None }
    }

    pub fn with_midi(mut self, midi: MidiMirror) -> Self {
        self.midi = Some(midi);
        self
    }

    pub fn pipeline(&self) -> &StringPipeline { &self.pipeline }
    pub fn audio(&self) -> &AudioEngine<B> { &self.audio }
    pub fn audio_mut(&mut self) -> &mut AudioEngine<B> { &mut self.audio }
    pub fn total_plucks(&self) -> u64 { self.total_plucks }

    pub fn is_started(&self) -> bool { self.audio.state() == AudioState::Running }

    /// The user's start action: build the audio graph once and resume it.
    pub fn start(&mut self) -> Result<(), InstallationError> {
        self.audio.initialize()?;
        self.audio.resume()?;
        Ok(())
    }

    /// One frame: run the pipeline and sound every pluck it reports.
    pub fn step(&mut self, frame: Option<&HandFrame>) -> FrameOutput {
        let out = self.pipeline.update(frame);
        self.sound(&out);
        out
    }

    /// One display frame fed with every detection queued since the last.
    pub fn step_batch(&mut self, frames: &[HandFrame]) -> FrameOutput {
        let out = self.pipeline.update_batch(frames);
        self.sound(&out);
        out
    }

    fn sound(&mut self, out: &FrameOutput) {
        for ev in &out.plucks {
            self.total_plucks += 1;
            if let Some(hz) = self.audio.play_pluck(ev.normalized_position) {
                self.last_hz = Some(hz);
                if let Some(midi) = &self.midi {
                    midi.pluck(hz);
                }
            }
        }
    }

    /// One-line summary for the status bar.
    pub fn status_line(&self) -> String {
        let audio = match self.audio.state() {
            AudioState::Uninitialized => "OFF",
            AudioState::Suspended => "PAUSED",
            AudioState::Running => "ON",
        };
        let hz = self.last_hz.map(|h| format!("{:.0}", h)).unwrap_or_else(|| "-".to_string());
        format!(
            "AUDIO {}  PLUCKS {}  RIPPLES {}  LAST HZ {}",
            audio,
            self.total_plucks,
            self.pipeline.ripples().len(),
            hz
        )
    }

    /// Release audio and MIDI.
    pub fn close(self) {
        let Installation { audio, midi, total_plucks, .. } = self;
        drop(midi);
        audio.close();
        info!(total_plucks, "installation closed");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Opens the window, starts the hand source, and drives one step per
/// displayed frame at ~60 fps until the window closes or Escape/Q is hit.
/// The tracker, audio stream and MIDI port are released on every exit path.
pub fn run(cfg: InstallationConfig) -> Result<(), InstallationError> {
    // ── Hand source first: a bad file path fails before any window opens ─
    let tracker = spawn_tracker(&cfg.tracker)?;

    let mut vis = Visualizer::new(&cfg.title, cfg.width, cfg.height)?;

    let pipeline = StringPipeline::new(cfg.surface_size(), cfg.pipeline);
    let audio = AudioEngine::new(cfg.synth, DeviceBackend::default());
    let mut app = Installation::new(pipeline, audio);

    if let Some(hint) = &cfg.midi_port {
        match MidiMirror::connect(hint, MirrorSettings::default()) {
            Ok(m) => app = app.with_midi(m),
            Err(e) => warn!(target: "midi", error = %e, "MIDI mirror disabled"),
        }
    }

    if cfg.autostart {
        app.start()?;
    }

    info!(width = cfg.width, height = cfg.height, tracker = ?cfg.tracker, "installation running");
    let result = frame_loop(&mut vis, &mut app, &tracker);

    tracker.shutdown();
    app.close();
    result
}

fn frame_loop<B: AudioBackend>(
    vis:     &mut Visualizer,
    app:     &mut Installation<B>,
    tracker: &TrackerHandle,
) -> Result<(), InstallationError> {
    let mut tracker_open = true;

    while vis.is_open() {
        // 1. Keys
        let input = vis.poll_input();
        if input.quit {
            info!("quit requested");
            break;
        }
        if input.start && !app.is_started() {
            app.start()?;
            info!("audio started");
        }

        // 2. Every hand frame finished since the last tick
        let frames = match tracker.poll() {
            TrackerPoll::Frames(frames) => frames,
            TrackerPoll::Idle => Vec::new(),
            TrackerPoll::Closed => {
                if tracker_open {
                    warn!(target: "tracker", "hand source closed; ripples will fade out");
                    tracker_open = false;
                }
                Vec::new()
            }
        };

        // 3. Per-frame logic
        app.step_batch(&frames);

        // 4. Render
        let status = app.status_line();
        let canvas = vis.canvas_mut();
        app.pipeline().render(canvas);
        draw_overlay(canvas, app.is_started(), &status);
        vis.present()?;
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pluck_core::landmarks::index::{INDEX_FINGER_TIP, THUMB_TIP};
    use pluck_core::Hand;
    use pluck_synth::OfflineBackend;

    fn make_app() -> Installation<OfflineBackend> {
        let cfg = InstallationConfig { width: 100, height: 100, ..InstallationConfig::default() };
        let pipeline = StringPipeline::with_seed(cfg.surface_size(), cfg.pipeline, 7);
        let audio = AudioEngine::new(cfg.synth, OfflineBackend::new(8000.0)).with_seed(7);
        Installation::new(pipeline, audio)
    }

    fn frame(thumb_y: f32) -> HandFrame {
        HandFrame::new(vec![
            Hand::uniform(0.0, 0.0)
                .with_landmark(INDEX_FINGER_TIP, 0.0, 0.5)
                .with_landmark(THUMB_TIP, 0.5, thumb_y),
            Hand::uniform(0.0, 0.0)
                .with_landmark(INDEX_FINGER_TIP, 1.0, 0.5)
                .with_landmark(THUMB_TIP, 1.0, 0.9),
        ])
    }

    #[test]
    fn plucks_before_start_are_seen_but_silent() {
        let mut app = make_app();
        app.step(Some(&frame(0.4)));
        let out = app.step(Some(&frame(0.6)));
        assert_eq!(out.plucks.len(), 1);
        assert_eq!(app.total_plucks(), 1);
        assert!(!app.is_started());
        assert!(app.audio().graph().is_none());
    }

    #[test]
    fn start_is_idempotent_and_runs_audio() {
        let mut app = make_app();
        app.start().unwrap();
        app.start().unwrap();
        assert!(app.is_started());
    }

    #[test]
    fn started_pluck_sounds_middle_pitch() {
        let mut app = make_app();
        app.start().unwrap();
        app.step(Some(&frame(0.4)));
        app.step(Some(&frame(0.6)));
        assert_eq!(app.last_hz, Some(500.0));
        let rendered = app.audio_mut().graph_mut().map(|g| g.render(512)).unwrap_or_default();
        assert!(rendered.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn batch_sounds_every_crossing() {
        let mut app = make_app();
        app.start().unwrap();
        let frames: Vec<HandFrame> = [0.4, 0.6, 0.4, 0.6].iter().map(|&y| frame(y)).collect();
        let out = app.step_batch(&frames);
        assert_eq!(out.plucks.len(), 3);
        assert_eq!(app.total_plucks(), 3);
    }

    #[test]
    fn status_line_reports_counts() {
        let mut app = make_app();
        assert!(app.status_line().starts_with("AUDIO OFF"));
        app.start().unwrap();
        app.step(Some(&frame(0.4)));
        app.step(Some(&frame(0.6)));
        let s = app.status_line();
        assert!(s.contains("PLUCKS 1"));
        assert!(s.contains("RIPPLES 1"));
        assert!(s.contains("LAST HZ 500"));
    }
}
