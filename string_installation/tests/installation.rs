use std::cell::Cell;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pluck_core::landmarks::index::{INDEX_FINGER_TIP, THUMB_TIP};
use pluck_core::{Hand, HandFrame, SurfaceSize};
use pluck_synth::{
    AudioBackend, AudioEngine, AudioGraph, AudioState, MixerFactory, OfflineBackend, SynthError,
    SynthSettings,
};
use ripple_field::RecordingSurface;
use string_installation::tracker::{
    spawn_hand_source, HandSource, JsonLinesHands, ScriptedHands, TrackerPoll,
};
use string_installation::{Installation, PipelineConfig, StringPipeline};

const SIZE: SurfaceSize = SurfaceSize::new(200.0, 100.0);

/// String from (0,50) to (200,50); the first hand's thumb at normalised
/// `(x, y)`, the second hand's thumb parked below the string.
fn frame(x: f32, y: f32) -> HandFrame {
    HandFrame::new(vec![
        Hand::uniform(0.0, 0.0)
            .with_landmark(INDEX_FINGER_TIP, 0.0, 0.5)
            .with_landmark(THUMB_TIP, x, y),
        Hand::uniform(0.0, 0.0)
            .with_landmark(INDEX_FINGER_TIP, 1.0, 0.5)
            .with_landmark(THUMB_TIP, 1.0, 0.9),
    ])
}

fn pipeline() -> StringPipeline {
    StringPipeline::with_seed(SIZE, PipelineConfig::default(), 3)
}

fn offline_app() -> Installation<OfflineBackend> {
    let audio = AudioEngine::new(SynthSettings::default(), OfflineBackend::new(8000.0)).with_seed(3);
    Installation::new(pipeline(), audio)
}

// ── crossing through the pipeline ────────────────────────────────────────

#[test]
fn crossing_in_the_middle_plucks_at_half() {
    let mut p = pipeline();
    p.update(Some(&frame(0.5, 0.4)));
    let out = p.update(Some(&frame(0.5, 0.6)));
    assert_eq!(out.plucks.len(), 1);
    assert_eq!(out.plucks[0].slot, 0);
    assert!((out.plucks[0].normalized_position - 0.5).abs() < 1e-6);
}

#[test]
fn movement_above_the_string_is_silent() {
    let mut p = pipeline();
    p.update(Some(&frame(0.2, 0.1)));
    p.update(Some(&frame(0.4, 0.3)));
    let out = p.update(Some(&frame(0.6, 0.45)));
    assert!(out.plucks.is_empty());
    assert_eq!(out.live_ripples, 0);
}

#[test]
fn touching_the_endpoint_does_not_pluck() {
    let mut p = pipeline();
    // thumb moves onto the left anchor itself
    p.update(Some(&frame(0.0, 0.3)));
    let out = p.update(Some(&frame(0.0, 0.5)));
    assert!(out.plucks.is_empty());
}

#[test]
fn a_frame_without_hands_breaks_the_stroke() {
    let mut p = pipeline();
    p.update(Some(&frame(0.5, 0.4)));
    p.update(Some(&HandFrame::default()));
    let out = p.update(Some(&frame(0.5, 0.6)));
    assert!(out.plucks.is_empty());
}

#[test]
fn one_hand_has_no_string_to_cross() {
    let mut p = pipeline();
    let lone = |y| HandFrame::new(vec![Hand::uniform(0.5, y)]);
    p.update(Some(&lone(0.4)));
    let out = p.update(Some(&lone(0.6)));
    assert!(out.anchors.is_none());
    assert!(out.plucks.is_empty());
}

// ── ripple lifetime ──────────────────────────────────────────────────────

#[test]
fn ripple_is_drawn_for_exactly_max_age_frames() {
    let mut cfg = PipelineConfig::default();
    cfg.ripples.max_age = 5;
    let mut p = StringPipeline::with_seed(SIZE, cfg, 9);

    p.update(Some(&frame(0.5, 0.4)));
    p.update(Some(&frame(0.5, 0.6)));

    let mut drawn = 0;
    for _ in 0..10 {
        let mut s = RecordingSurface::new(SIZE.width, SIZE.height);
        p.render(&mut s);
        if s.paths().count() > 0 {
            drawn += 1;
        }
        p.update(None);
    }
    assert_eq!(drawn, 5);
    assert!(p.ripples().is_empty());
}

// ── audio ────────────────────────────────────────────────────────────────

#[test]
fn pluck_positions_map_onto_the_pitch_range() {
    let mut engine = AudioEngine::new(SynthSettings::default(), OfflineBackend::new(8000.0));
    engine.initialize().unwrap();
    assert_eq!(engine.play_pluck(0.0), Some(200.0));
    assert_eq!(engine.play_pluck(1.0), Some(800.0));
    assert_eq!(engine.play_pluck(0.5), Some(500.0));
}

struct CountingBackend {
    opened: Rc<Cell<usize>>,
}

struct CountingGraph {
    running: bool,
}

impl AudioGraph for CountingGraph {
    fn trigger(&mut self, _frequency: f32) {}
    fn resume(&mut self) -> Result<(), SynthError> {
        self.running = true;
        Ok(())
    }
    fn is_running(&self) -> bool { self.running }
}

impl AudioBackend for CountingBackend {
    type Graph = CountingGraph;
    fn open(&mut self, _mixer: MixerFactory) -> Result<CountingGraph, SynthError> {
        self.opened.set(self.opened.get() + 1);
        Ok(CountingGraph { running: false })
    }
}

#[test]
fn repeated_start_builds_one_graph() {
    let opened = Rc::new(Cell::new(0));
    let audio = AudioEngine::new(
        SynthSettings::default(),
        CountingBackend { opened: Rc::clone(&opened) },
    );
    let mut app = Installation::new(pipeline(), audio);

    app.start().unwrap();
    app.start().unwrap();
    app.start().unwrap();
    assert_eq!(opened.get(), 1);
    assert_eq!(app.audio().state(), AudioState::Running);
}

#[test]
fn plucks_after_start_reach_the_mixer() {
    let mut app = offline_app();
    app.start().unwrap();
    app.step(Some(&frame(0.25, 0.4)));
    let out = app.step(Some(&frame(0.25, 0.6)));
    assert_eq!(out.plucks.len(), 1);

    let samples = app
        .audio_mut()
        .graph_mut()
        .map(|g| g.render(1024))
        .unwrap_or_default();
    assert!(samples.iter().any(|s| s.abs() > 1e-4));
}

// ── tracker ──────────────────────────────────────────────────────────────

/// Never emits; waits for the stop flag.
struct Silent;

impl HandSource for Silent {
    fn run(self: Box<Self>, _tx: Sender<HandFrame>, stop: Arc<AtomicBool>) {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(2));
        }
    }
}

#[test]
fn tracker_shuts_down_before_its_first_frame() {
    let handle = spawn_hand_source(Silent).unwrap();
    assert!(matches!(handle.poll(), TrackerPoll::Idle));
    let t0 = Instant::now();
    handle.shutdown();
    assert!(t0.elapsed() < Duration::from_secs(2));
}

#[test]
fn frames_queued_between_ticks_all_reach_the_detector() {
    let lines: String = (0..20)
        .map(|i| {
            let y = if i % 2 == 0 { 0.4 } else { 0.6 };
            format!("{}\n", frame_json(0.5, y))
        })
        .collect();
    let source = JsonLinesHands::new(Cursor::new(lines.into_bytes()), "recorded");
    let handle = spawn_hand_source(source).unwrap();
    // let the whole recording pile up before the first tick
    thread::sleep(Duration::from_millis(100));

    let mut app = offline_app();
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match handle.poll() {
            TrackerPoll::Frames(frames) => {
                app.step_batch(&frames);
            }
            TrackerPoll::Idle => thread::sleep(Duration::from_millis(16)),
            TrackerPoll::Closed => break,
        }
    }
    assert_eq!(app.total_plucks(), 19);
}

fn frame_json(x: f32, y: f32) -> String {
    serde_json::to_string(&frame(x, y)).unwrap()
}

#[test]
fn scripted_hands_pluck_through_the_installation() {
    let script = ScriptedHands { fps: 0.0, period_frames: 12, limit: Some(48) };
    let mut app = offline_app();
    app.start().unwrap();

    let mut plucks = 0;
    for tick in 0..48 {
        plucks += app.step(Some(&script.frame_at(tick))).plucks.len();
    }
    // two crossings per swing, four swings
    assert!(plucks >= 6, "only {plucks} plucks");
    assert_eq!(app.total_plucks(), plucks as u64);
    assert!(app.status_line().starts_with("AUDIO ON"));
}
