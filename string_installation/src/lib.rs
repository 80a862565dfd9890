//! # string_installation
//!
//! A string you can pluck in the air.  The index fingertips of the first two
//! tracked hands hold the ends of a glowing string; a thumb tip that passes
//! through the string plucks it, ringing a tone whose pitch follows the
//! horizontal position and leaving a spiral ripple that fades out.
//!
//! ## Frame flow
//!
//! | Stage | Crate | Output |
//! |---|---|---|
//! | Hand source thread | [`tracker`] | `HandFrame` over a channel |
//! | Landmark extraction | `pluck_core` | string anchors + pluckers |
//! | Crossing detection | `pluck_core` | pluck events |
//! | Ripples | `ripple_field` | spawn, advance, draw |
//! | Tone | `pluck_synth` via [`audio_out`] | one voice per pluck |
//! | MIDI (optional) | [`midi_mirror`] | note-on / note-off |
//!
//! ## Hand sources
//!
//! * (default) **Scripted**: two synthetic hands and a sweeping thumb.
//! * `--tracker stdin` / `--tracker <file>`: one `HandFrame` JSON object per
//!   line, as written by an external hand-landmark process.
//! * `leap` feature: fingertips from a LeapMotion controller via LeapC.
//!
//! ## Window keys
//!
//! | Key | Action |
//! |---|---|
//! | `Space` | Start audio (required once before any sound) |
//! | `Escape` / `Q` | Quit |

pub mod tracker;
pub mod pipeline;
pub mod visualizer;
pub mod audio_out;
pub mod midi_mirror;
pub mod app;

pub use app::{Installation, InstallationConfig, run};
pub use pipeline::{FrameOutput, PipelineConfig, StringPipeline, StringStyle};
pub use tracker::{HandSource, TrackerHandle, TrackerKind, TrackerPoll};

/// Failures that stop the installation or one of its optional parts.
#[derive(Debug, thiserror::Error)]
pub enum InstallationError {
    #[error("window: {0}")]
    Window(String),

    #[error(transparent)]
    Audio(#[from] pluck_synth::SynthError),

    #[error("hand tracker: {0}")]
    Tracker(String),

    #[error("MIDI: {0}")]
    Midi(String),
}
