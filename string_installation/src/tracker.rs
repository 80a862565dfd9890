//! Hand sources: scripted, JSON lines, and LeapMotion hardware.
//!
//! Every source runs on its own thread and delivers [`HandFrame`]s over an
//! `mpsc` channel.  The frame loop does not know which kind it is talking
//! to; it only polls the [`TrackerHandle`].

use std::f32::consts::TAU;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use pluck_core::landmarks::index::{INDEX_FINGER_TIP, THUMB_TIP};
use pluck_core::{Hand, HandFrame};

use crate::InstallationError;

/// How long `shutdown` waits for a source to notice the stop flag.
const JOIN_GRACE: Duration = Duration::from_millis(500);

// ════════════════════════════════════════════════════════════════════════════
// HandSource trait — unified interface for every tracker
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`HandFrame`]s over a channel.
pub trait HandSource: Send + 'static {
    /// Produce frames until `stop` is raised, the receiver hangs up, or the
    /// source runs dry.
    fn run(self: Box<Self>, tx: Sender<HandFrame>, stop: Arc<AtomicBool>);
}

// ════════════════════════════════════════════════════════════════════════════
// TrackerHandle
// ════════════════════════════════════════════════════════════════════════════

/// Result of polling the tracker once per display frame.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackerPoll {
    /// Every frame finished since the last poll, oldest first.
    Frames(Vec<HandFrame>),
    /// Nothing new yet.
    Idle,
    /// The source has stopped for good.
    Closed,
}

/// Owns a running hand source.  Dropping it stops the source thread.
pub struct TrackerHandle {
    rx:   Receiver<HandFrame>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    /// Drain the channel without blocking.  Frames queued before the
    /// source closed are returned first; `Closed` comes on a later poll.
    pub fn poll(&self) -> TrackerPoll {
        let mut frames = Vec::new();
        let mut closed = false;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => frames.push(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    closed = true;
                    break;
                }
            }
        }
        if !frames.is_empty() {
            TrackerPoll::Frames(frames)
        } else if closed {
            TrackerPoll::Closed
        } else {
            TrackerPoll::Idle
        }
    }

    /// Block until the next frame or until the source closes.
    pub fn recv_timeout(&self, timeout: Duration) -> TrackerPoll {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => TrackerPoll::Frames(vec![frame]),
            Err(mpsc::RecvTimeoutError::Timeout) => TrackerPoll::Idle,
            Err(mpsc::RecvTimeoutError::Disconnected) => TrackerPoll::Closed,
        }
    }

    /// Raise the stop flag and wait briefly for the thread to exit.
    pub fn shutdown(mut self) { self.stop_and_join(); }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let Some(join) = self.join.take() else { return };

        let deadline = Instant::now() + JOIN_GRACE;
        while !join.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if !join.is_finished() {
            // A source blocked on a read cannot see the flag; let it go.
            warn!(target: "tracker", "hand source still blocked, detaching thread");
            return;
        }
        if join.join().is_err() {
            error!(target: "tracker", "hand source thread panicked");
        } else {
            debug!(target: "tracker", "hand source stopped");
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) { self.stop_and_join(); }
}

/// Spawn a hand source on its own thread.
pub fn spawn_hand_source<H: HandSource>(source: H) -> Result<TrackerHandle, InstallationError> {
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let join = thread::Builder::new()
        .name("hand-source".into())
        .spawn(move || Box::new(source).run(tx, flag))
        .map_err(|e| InstallationError::Tracker(e.to_string()))?;
    Ok(TrackerHandle { rx, stop, join: Some(join) })
}

// ════════════════════════════════════════════════════════════════════════════
// TrackerKind — command-line selection
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum TrackerKind {
    #[default]
    Scripted,
    Stdin,
    File(PathBuf),
    Leap,
}

impl FromStr for TrackerKind {
    type Err = String;

    /// `scripted`, `stdin` (or `-`), `leap`; anything else is a file path.
    fn from_str(s: &str) -> Result<Self, String> {
        match s.trim() {
            "" => Err("empty tracker name".to_string()),
            "scripted" | "sim" => Ok(TrackerKind::Scripted),
            "stdin" | "-" => Ok(TrackerKind::Stdin),
            "leap" => Ok(TrackerKind::Leap),
            path => Ok(TrackerKind::File(PathBuf::from(path))),
        }
    }
}

/// Start the selected source.
pub fn spawn_tracker(kind: &TrackerKind) -> Result<TrackerHandle, InstallationError> {
    info!(target: "tracker", ?kind, "starting hand source");
    match kind {
        TrackerKind::Scripted => spawn_hand_source(ScriptedHands::default()),
        TrackerKind::Stdin => spawn_hand_source(JsonLinesHands::stdin()),
        TrackerKind::File(path) => spawn_hand_source(JsonLinesHands::open(path)?),
        #[cfg(feature = "leap")]
        TrackerKind::Leap => spawn_hand_source(LeapHands::default()),
        #[cfg(not(feature = "leap"))]
        TrackerKind::Leap => Err(InstallationError::Tracker(
            "built without the `leap` feature".to_string(),
        )),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedHands — synthetic hands, always available
// ════════════════════════════════════════════════════════════════════════════

/// Two still hands hold a horizontal string; the left thumb swings up and
/// down through it while drifting sideways, so pitch changes over time.
#[derive(Clone, Copy, Debug)]
pub struct ScriptedHands {
    pub fps:           f32,
    /// Frames per full up-and-down swing.
    pub period_frames: u32,
    /// Stop after this many frames; `None` runs until stopped.
    pub limit:         Option<u64>,
}

impl Default for ScriptedHands {
    fn default() -> Self {
        ScriptedHands { fps: 30.0, period_frames: 48, limit: None }
    }
}

impl ScriptedHands {
    pub const STRING_Y:  f32 = 0.5;
    pub const LEFT_END:  f32 = 0.25;
    pub const RIGHT_END: f32 = 0.75;

    /// The frame emitted at `tick`.
    pub fn frame_at(&self, tick: u64) -> HandFrame {
        let period = self.period_frames.max(2) as f32;
        // Half-step offset keeps the thumb off the string line exactly.
        let swing = ((tick as f32 + 0.5) / period * TAU).sin();

        let drift_len = period * 8.0;
        let drift = (tick as f32 % drift_len) / drift_len;
        let tri = 1.0 - (2.0 * drift - 1.0).abs();

        let thumb_x = 0.3 + 0.4 * tri;
        let thumb_y = Self::STRING_Y + 0.15 * swing;

        let mut left = Hand::uniform(0.2, 0.7)
            .with_landmark(INDEX_FINGER_TIP, Self::LEFT_END, Self::STRING_Y)
            .with_landmark(THUMB_TIP, thumb_x, thumb_y);
        left.handedness = Some("Left".to_string());

        let mut right = Hand::uniform(0.8, 0.7)
            .with_landmark(INDEX_FINGER_TIP, Self::RIGHT_END, Self::STRING_Y)
            .with_landmark(THUMB_TIP, 0.72, 0.65);
        right.handedness = Some("Right".to_string());

        HandFrame::new(vec![left, right])
    }
}

impl HandSource for ScriptedHands {
    fn run(self: Box<Self>, tx: Sender<HandFrame>, stop: Arc<AtomicBool>) {
        let interval = if self.fps > 0.0 {
            Duration::from_secs_f32(1.0 / self.fps)
        } else {
            Duration::ZERO
        };
        let mut tick = 0u64;
        while !stop.load(Ordering::Relaxed) {
            if self.limit.is_some_and(|n| tick >= n) {
                break;
            }
            if tx.send(self.frame_at(tick)).is_err() {
                break;
            }
            tick += 1;
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }
        debug!(target: "tracker", frames = tick, "scripted hands finished");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesHands — frames from an external landmark process
// ════════════════════════════════════════════════════════════════════════════

/// Playback rate for recorded files.
pub const REPLAY_FPS: f32 = 30.0;

/// One `HandFrame` JSON object per line.  Malformed lines are skipped.
pub struct JsonLinesHands {
    reader:   Box<dyn BufRead + Send>,
    label:    String,
    /// Pause after each frame; zero for live streams that pace themselves.
    interval: Duration,
}

impl JsonLinesHands {
    pub fn new(reader: impl BufRead + Send + 'static, label: impl Into<String>) -> Self {
        JsonLinesHands { reader: Box::new(reader), label: label.into(), interval: Duration::ZERO }
    }

    /// Emit at most `fps` frames per second; 0 or less disables pacing.
    pub fn with_fps(mut self, fps: f32) -> Self {
        self.interval = if fps > 0.0 { Duration::from_secs_f32(1.0 / fps) } else { Duration::ZERO };
        self
    }

    pub fn stdin() -> Self { Self::new(BufReader::new(io::stdin()), "stdin") }

    /// A recording, replayed at [`REPLAY_FPS`].
    pub fn open(path: &Path) -> Result<Self, InstallationError> {
        let f = File::open(path)
            .map_err(|e| InstallationError::Tracker(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(BufReader::new(f), path.display().to_string()).with_fps(REPLAY_FPS))
    }
}

impl HandSource for JsonLinesHands {
    fn run(self: Box<Self>, tx: Sender<HandFrame>, stop: Arc<AtomicBool>) {
        let JsonLinesHands { reader, label, interval } = *self;
        let mut frames = 0usize;
        for (line_no, line) in reader.lines().enumerate() {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(target: "tracker", source = %label, line_no, error = %e, "read failed, closing");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match HandFrame::from_json(&line) {
                Ok(frame) => {
                    frames += 1;
                    if tx.send(frame).is_err() {
                        break;
                    }
                    if !interval.is_zero() {
                        thread::sleep(interval);
                    }
                }
                Err(e) => warn!(target: "tracker", source = %label, line_no, error = %e, "skipping malformed frame"),
            }
        }
        info!(target: "tracker", source = %label, frames, "hand stream ended");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHands — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Fingertips from a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Millimetre coordinates above the device are mapped into the normalised
/// image space the extractor expects (x right, y down).
#[cfg(feature = "leap")]
#[derive(Clone, Copy, Debug)]
pub struct LeapHands {
    /// Horizontal span (mm) mapped onto 0.0–1.0.
    pub x_range_mm: (f32, f32),
    /// Height span (mm) mapped onto 1.0–0.0.
    pub y_range_mm: (f32, f32),
}

#[cfg(feature = "leap")]
impl Default for LeapHands {
    fn default() -> Self {
        LeapHands { x_range_mm: (-200.0, 200.0), y_range_mm: (80.0, 400.0) }
    }
}

#[cfg(feature = "leap")]
impl LeapHands {
    fn norm_x(&self, x: f32) -> f32 {
        let (lo, hi) = self.x_range_mm;
        (x - lo) / (hi - lo)
    }

    fn norm_y(&self, y: f32) -> f32 {
        let (lo, hi) = self.y_range_mm;
        1.0 - (y - lo) / (hi - lo)
    }
}

#[cfg(feature = "leap")]
impl HandSource for LeapHands {
    fn run(self: Box<Self>, tx: Sender<HandFrame>, stop: Arc<AtomicBool>) {
        use leaprs::{Connection, ConnectionConfig, Event};

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c) => c,
            Err(e) => {
                error!(target: "tracker", error = ?e, "cannot create LeapC connection");
                return;
            }
        };
        if let Err(e) = connection.open() {
            error!(target: "tracker", error = ?e, "cannot open LeapMotion device");
            return;
        }
        info!(target: "tracker", "LeapMotion connected");

        while !stop.load(Ordering::Relaxed) {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<Hand> = frame
                    .hands()
                    .map(|h| {
                        let palm = h.palm().position();
                        let mut hand = Hand::uniform(self.norm_x(palm.x), self.norm_y(palm.y));
                        let digits: Vec<_> = h.digits().collect();
                        if digits.len() >= 2 {
                            let thumb = digits[0].distal().next_joint();
                            let index = digits[1].distal().next_joint();
                            hand = hand
                                .with_landmark(THUMB_TIP, self.norm_x(thumb.x), self.norm_y(thumb.y))
                                .with_landmark(INDEX_FINGER_TIP, self.norm_x(index.x), self.norm_y(index.y));
                        }
                        hand
                    })
                    .collect();
                if tx.send(HandFrame::new(hands)).is_err() {
                    return;
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
