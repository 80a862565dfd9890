//! Start-gated audio engine and the backend seam.
//!
//! The engine is an explicitly constructed, long-lived value owned by the
//! application.  Output devices implement [`AudioBackend`]; the engine asks
//! the backend for a graph exactly once, on the first `initialize()`.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use crate::mixer::Mixer;
use crate::pitch::PitchRange;
use crate::reverb::ReverbSettings;
use crate::voice::Waveform;
use crate::SynthError;

// ════════════════════════════════════════════════════════════════════════════
// SynthSettings
// ════════════════════════════════════════════════════════════════════════════

/// Every tunable of the pluck sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthSettings {
    pub pitch:       PitchRange,
    pub envelope:    Envelope,
    pub reverb:      ReverbSettings,
    pub waveform:    Waveform,
    pub master_gain: f32,
}

impl Default for SynthSettings {
    fn default() -> Self {
        SynthSettings {
            pitch:       PitchRange::default(),
            envelope:    Envelope::default(),
            reverb:      ReverbSettings::default(),
            waveform:    Waveform::default(),
            master_gain: 0.8,
        }
    }
}

impl SynthSettings {
    pub fn validate(&self) -> Result<(), SynthError> {
        let checks: [(&str, f32, bool); 9] = [
            ("pitch.base_hz",      self.pitch.base_hz,      self.pitch.base_hz > 0.0),
            ("pitch.range_hz",     self.pitch.range_hz,     self.pitch.range_hz >= 0.0),
            ("pitch.step_hz",      self.pitch.step_hz,      self.pitch.step_hz >= 0.0),
            ("envelope.attack_s",  self.envelope.attack_s,  self.envelope.attack_s >= 0.0),
            ("envelope.decay_s",   self.envelope.decay_s,   self.envelope.decay_s >= 0.0),
            ("envelope.floor",     self.envelope.floor,     self.envelope.floor > 0.0),
            ("reverb.duration_s",  self.reverb.duration_s,  self.reverb.duration_s >= 0.0),
            ("reverb.decay",       self.reverb.decay,       self.reverb.decay >= 0.0),
            ("master_gain",        self.master_gain,        self.master_gain >= 0.0),
        ];
        for (name, value, ok) in checks {
            if !ok {
                return Err(SynthError::InvalidSettings(format!("{} = {}", name, value)));
            }
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Backend traits
// ════════════════════════════════════════════════════════════════════════════

/// Builds the [`Mixer`] once the backend knows its sample rate.
#[derive(Clone, Copy, Debug)]
pub struct MixerFactory {
    pub settings: SynthSettings,
    pub seed:     Option<u64>,
}

impl MixerFactory {
    pub fn build(&self, sample_rate: f32) -> Mixer {
        let mut rng = match self.seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None    => SmallRng::from_os_rng(),
        };
        let s = &self.settings;
        Mixer::new(sample_rate, s.waveform, s.envelope, &s.reverb, s.master_gain, &mut rng)
    }
}

/// A live signal graph.  Dropping it releases the output device.
pub trait AudioGraph {
    /// Start a voice.  Fire-and-forget: the voice ends by itself.
    fn trigger(&mut self, frequency: f32);

    /// Lift the suspended state.  No-op when already running.
    fn resume(&mut self) -> Result<(), SynthError>;

    fn is_running(&self) -> bool;
}

/// Something that can open an output graph.
pub trait AudioBackend {
    type Graph: AudioGraph;

    /// Open the device and build a graph in the suspended state.
    fn open(&mut self, mixer: MixerFactory) -> Result<Self::Graph, SynthError>;
}

// ════════════════════════════════════════════════════════════════════════════
// AudioEngine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioState {
    Uninitialized,
    Suspended,
    Running,
}

pub struct AudioEngine<B: AudioBackend> {
    backend:      B,
    settings:     SynthSettings,
    seed:         Option<u64>,
    graph:        Option<B::Graph>,
    warned_early: bool,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new(settings: SynthSettings, backend: B) -> Self {
        AudioEngine { backend, settings, seed: None, graph: None, warned_early: false }
    }

    /// Fix the reverb noise seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn settings(&self) -> &SynthSettings { &self.settings }

    pub fn state(&self) -> AudioState {
        match &self.graph {
            None => AudioState::Uninitialized,
            Some(g) if g.is_running() => AudioState::Running,
            Some(_) => AudioState::Suspended,
        }
    }

    pub fn is_ready(&self) -> bool { self.graph.is_some() }

    pub fn graph(&self) -> Option<&B::Graph> { self.graph.as_ref() }
    pub fn graph_mut(&mut self) -> Option<&mut B::Graph> { self.graph.as_mut() }
    pub fn backend(&self) -> &B { &self.backend }

    /// Build the graph.  Calls after the first successful one do nothing.
    pub fn initialize(&mut self) -> Result<(), SynthError> {
        if self.graph.is_some() {
            debug!("audio engine already initialized");
            return Ok(());
        }
        self.settings.validate()?;
        let factory = MixerFactory { settings: self.settings, seed: self.seed };
        let graph = self.backend.open(factory)?;
        info!(
            base_hz = self.settings.pitch.base_hz,
            range_hz = self.settings.pitch.range_hz,
            step_hz = self.settings.pitch.step_hz,
            reverb_s = self.settings.reverb.duration_s,
            "audio graph ready"
        );
        self.graph = Some(graph);
        Ok(())
    }

    /// Resume a suspended graph.
    pub fn resume(&mut self) -> Result<(), SynthError> {
        let graph = self.graph.as_mut().ok_or(SynthError::NotInitialized)?;
        if !graph.is_running() {
            graph.resume()?;
            info!("audio resumed");
        }
        Ok(())
    }

    /// Play one pluck.  Returns the quantised frequency, or `None` when the
    /// engine has not been initialised yet.
    pub fn play_pluck(&mut self, normalized_position: f32) -> Option<f32> {
        let Some(graph) = self.graph.as_mut() else {
            if !self.warned_early {
                warn!("pluck ignored: audio not started yet");
                self.warned_early = true;
            }
            return None;
        };
        let hz = self.settings.pitch.frequency_for(normalized_position);
        debug!(normalized_position, hz, "pluck voice");
        graph.trigger(hz);
        Some(hz)
    }

    /// Tear down the graph and release the device.
    pub fn close(mut self) {
        if self.graph.take().is_some() {
            info!("audio graph closed");
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// OfflineBackend — renders into memory
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
pub struct OfflineBackend {
    pub sample_rate: f32,
}

impl OfflineBackend {
    pub fn new(sample_rate: f32) -> Self { OfflineBackend { sample_rate } }
}

#[derive(Debug)]
pub struct OfflineGraph {
    pub mixer: Mixer,
    running:   bool,
}

impl OfflineGraph {
    /// Interleaved stereo; silence while suspended.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        if self.running {
            self.mixer.render_stereo(frames)
        } else {
            vec![0.0; frames * 2]
        }
    }
}

impl AudioGraph for OfflineGraph {
    fn trigger(&mut self, frequency: f32) { self.mixer.trigger(frequency); }

    fn resume(&mut self) -> Result<(), SynthError> {
        self.running = true;
        Ok(())
    }

    fn is_running(&self) -> bool { self.running }
}

impl AudioBackend for OfflineBackend {
    type Graph = OfflineGraph;

    fn open(&mut self, mixer: MixerFactory) -> Result<OfflineGraph, SynthError> {
        Ok(OfflineGraph { mixer: mixer.build(self.sample_rate), running: false })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    // ── counting backend ──────────────────────────────────────────────────
    #[derive(Default, Clone)]
    struct Counters {
        opened:    Rc<Cell<usize>>,
        closed:    Rc<Cell<usize>>,
        triggered: Rc<Cell<usize>>,
    }

    struct CountingBackend(Counters);

    struct CountingGraph {
        counters: Counters,
        running:  bool,
    }

    impl AudioGraph for CountingGraph {
        fn trigger(&mut self, _frequency: f32) {
            self.counters.triggered.set(self.counters.triggered.get() + 1);
        }
        fn resume(&mut self) -> Result<(), SynthError> {
            self.running = true;
            Ok(())
        }
        fn is_running(&self) -> bool { self.running }
    }

    impl Drop for CountingGraph {
        fn drop(&mut self) { self.counters.closed.set(self.counters.closed.get() + 1); }
    }

    impl AudioBackend for CountingBackend {
        type Graph = CountingGraph;
        fn open(&mut self, _mixer: MixerFactory) -> Result<CountingGraph, SynthError> {
            self.0.opened.set(self.0.opened.get() + 1);
            Ok(CountingGraph { counters: self.0.clone(), running: false })
        }
    }

    fn counting() -> (AudioEngine<CountingBackend>, Counters) {
        let c = Counters::default();
        (AudioEngine::new(SynthSettings::default(), CountingBackend(c.clone())), c)
    }

    // ── lifecycle ─────────────────────────────────────────────────────────
    #[test]
    fn initialize_is_idempotent() {
        let (mut engine, c) = counting();
        engine.initialize().unwrap();
        engine.initialize().unwrap();
        engine.initialize().unwrap();
        assert_eq!(c.opened.get(), 1);
        assert_eq!(c.closed.get(), 0);
        assert!(engine.is_ready());
    }

    #[test]
    fn state_transitions() {
        let (mut engine, _) = counting();
        assert_eq!(engine.state(), AudioState::Uninitialized);
        engine.initialize().unwrap();
        assert_eq!(engine.state(), AudioState::Suspended);
        engine.resume().unwrap();
        assert_eq!(engine.state(), AudioState::Running);
        engine.resume().unwrap();
        assert_eq!(engine.state(), AudioState::Running);
    }

    #[test]
    fn resume_before_initialize_fails() {
        let (mut engine, _) = counting();
        assert!(matches!(engine.resume(), Err(SynthError::NotInitialized)));
    }

    #[test]
    fn pluck_before_start_is_dropped() {
        let (mut engine, c) = counting();
        assert_eq!(engine.play_pluck(0.5), None);
        assert_eq!(engine.play_pluck(0.5), None);
        assert_eq!(c.triggered.get(), 0);
    }

    #[test]
    fn pluck_maps_position_to_quantised_frequency() {
        let (mut engine, c) = counting();
        engine.initialize().unwrap();
        assert_eq!(engine.play_pluck(0.0), Some(200.0));
        assert_eq!(engine.play_pluck(1.0), Some(800.0));
        assert_eq!(engine.play_pluck(0.26), Some(350.0));
        assert_eq!(c.triggered.get(), 3);
    }

    // ── teardown ──────────────────────────────────────────────────────────
    #[test]
    fn dropping_uninitialized_engine_touches_nothing() {
        let (engine, c) = counting();
        drop(engine);
        assert_eq!(c.opened.get(), 0);
        assert_eq!(c.closed.get(), 0);
    }

    #[test]
    fn close_releases_graph() {
        let (mut engine, c) = counting();
        engine.initialize().unwrap();
        engine.close();
        assert_eq!(c.closed.get(), 1);
    }

    #[test]
    fn drop_releases_graph() {
        let (mut engine, c) = counting();
        engine.initialize().unwrap();
        drop(engine);
        assert_eq!(c.closed.get(), 1);
    }

    // ── settings ──────────────────────────────────────────────────────────
    #[test]
    fn invalid_settings_refuse_to_open() {
        let c = Counters::default();
        let mut settings = SynthSettings::default();
        settings.envelope.floor = 0.0;
        let mut engine = AudioEngine::new(settings, CountingBackend(c.clone()));
        assert!(matches!(engine.initialize(), Err(SynthError::InvalidSettings(_))));
        assert_eq!(c.opened.get(), 0);
        assert_eq!(engine.state(), AudioState::Uninitialized);
    }

    #[test]
    fn nan_settings_are_invalid() {
        let mut settings = SynthSettings::default();
        settings.master_gain = f32::NAN;
        assert!(settings.validate().is_err());
    }

    // ── offline rendering ─────────────────────────────────────────────────
    #[test]
    fn offline_graph_is_silent_until_resumed() {
        let mut engine = AudioEngine::new(SynthSettings::default(), OfflineBackend::new(8000.0))
            .with_seed(5);
        engine.initialize().unwrap();
        engine.play_pluck(0.5);
        let quiet = engine.graph_mut().unwrap().render(256);
        assert!(quiet.iter().all(|s| *s == 0.0));

        engine.resume().unwrap();
        let loud = engine.graph_mut().unwrap().render(256);
        assert!(loud.iter().any(|s| s.abs() > 0.05));
    }
}
