//! # pluck_synth
//!
//! Turns a normalised pluck position (0.0–1.0) into a short plucked tone:
//!
//! * **Position** → frequency on a linear range, snapped to a fixed grid
//! * **Envelope** → 10 ms linear attack, 1.5 s exponential decay
//! * **Routing** → dry path and a shared convolution-reverb send, summed
//!   into one master gain
//!
//! The reverb's impulse response is synthetic (decaying stereo noise), made
//! once when the engine initialises.
//!
//! ## Lifecycle
//!
//! Audio may only start after an explicit user action, so the engine has
//! two phases:
//!
//! ```text
//!   Uninitialized ──initialize()──▶ Suspended ──resume()──▶ Running
//! ```
//!
//! `initialize()` is idempotent.  Device output lives behind the
//! [`AudioBackend`] trait; [`OfflineBackend`] renders into memory.
//!
//! ## Quick start
//!
//! ```rust
//! use pluck_synth::{AudioEngine, OfflineBackend, SynthSettings};
//!
//! let mut engine = AudioEngine::new(SynthSettings::default(), OfflineBackend::new(8_000.0));
//! engine.initialize().unwrap();
//! engine.resume().unwrap();
//! assert_eq!(engine.play_pluck(0.0), Some(200.0));
//! assert_eq!(engine.play_pluck(1.0), Some(800.0));
//! ```

pub mod pitch;
pub mod envelope;
pub mod voice;
pub mod reverb;
pub mod mixer;
pub mod engine;
pub mod wav;

pub use pitch::{PitchRange, midi_note_for};
pub use envelope::Envelope;
pub use voice::{Voice, Waveform};
pub use reverb::{Convolver, ReverbImpulse, ReverbSettings};
pub use mixer::Mixer;
pub use engine::{
    AudioBackend, AudioEngine, AudioGraph, AudioState, MixerFactory, OfflineBackend, OfflineGraph,
    SynthSettings,
};

/// Errors raised by the audio engine and its backends.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("audio engine has not been initialized")]
    NotInitialized,

    #[error("no audio output device: {0}")]
    Device(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("invalid synth settings: {0}")]
    InvalidSettings(String),
}
