//! Audio device output.
//!
//! [`DeviceBackend`] opens the default output device through `cpal` and
//! moves a [`Mixer`] into the device callback; plucks reach it over a
//! channel.  When no usable device exists it falls back to a silent graph
//! with a warning, so the installation keeps running visually.

use std::sync::mpsc::{self, Receiver, Sender};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, warn};

use pluck_synth::{AudioBackend, AudioGraph, Mixer, MixerFactory, SynthError};

// ════════════════════════════════════════════════════════════════════════════
// DeviceBackend
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
pub struct DeviceBackend {
    /// Use a silent graph instead of failing when the device cannot open.
    pub fallback_to_null: bool,
}

impl Default for DeviceBackend {
    fn default() -> Self { DeviceBackend { fallback_to_null: true } }
}

impl AudioBackend for DeviceBackend {
    type Graph = OutputGraph;

    fn open(&mut self, mixer: MixerFactory) -> Result<OutputGraph, SynthError> {
        match CpalGraph::open(mixer) {
            Ok(g) => Ok(OutputGraph::Device(g)),
            Err(e) if self.fallback_to_null => {
                warn!(target: "audio", error = %e, "no audio output, continuing silently");
                Ok(OutputGraph::Null(NullGraph::default()))
            }
            Err(e) => Err(e),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// OutputGraph — device or null
// ════════════════════════════════════════════════════════════════════════════

pub enum OutputGraph {
    Device(CpalGraph),
    Null(NullGraph),
}

impl OutputGraph {
    pub fn is_null(&self) -> bool { matches!(self, OutputGraph::Null(_)) }
}

impl AudioGraph for OutputGraph {
    fn trigger(&mut self, frequency: f32) {
        match self {
            OutputGraph::Device(g) => g.trigger(frequency),
            OutputGraph::Null(g) => g.trigger(frequency),
        }
    }

    fn resume(&mut self) -> Result<(), SynthError> {
        match self {
            OutputGraph::Device(g) => g.resume(),
            OutputGraph::Null(g) => g.resume(),
        }
    }

    fn is_running(&self) -> bool {
        match self {
            OutputGraph::Device(g) => g.is_running(),
            OutputGraph::Null(g) => g.is_running(),
        }
    }
}

// ── null graph (used when no device is available) ─────────────────────────

#[derive(Debug, Default)]
pub struct NullGraph {
    running:   bool,
    triggered: usize,
}

impl NullGraph {
    pub fn triggered(&self) -> usize { self.triggered }
}

impl AudioGraph for NullGraph {
    fn trigger(&mut self, _frequency: f32) { self.triggered += 1; }
    fn resume(&mut self) -> Result<(), SynthError> {
        self.running = true;
        Ok(())
    }
    fn is_running(&self) -> bool { self.running }
}

// ════════════════════════════════════════════════════════════════════════════
// CpalGraph
// ════════════════════════════════════════════════════════════════════════════

/// A paused-until-resumed `cpal` output stream.  Dropping it closes the
/// device.
pub struct CpalGraph {
    stream:      cpal::Stream,
    voices:      Sender<f32>,
    running:     bool,
    sample_rate: u32,
    channels:    u16,
    warned_lost: bool,
}

impl CpalGraph {
    fn open(factory: MixerFactory) -> Result<Self, SynthError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SynthError::Device("no default output device".to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| SynthError::Device(e.to_string()))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(SynthError::UnsupportedFormat(format!("{:?}", supported.sample_format())));
        }
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        let mixer = factory.build(sample_rate as f32);
        let (voices, rx) = mpsc::channel();
        let callback = device_callback(mixer, rx, channels as usize);

        let stream = device
            .build_output_stream(
                &config,
                callback,
                |e| error!(target: "audio", error = %e, "output stream error"),
                None,
            )
            .map_err(|e| SynthError::Stream(e.to_string()))?;
        // Some hosts start streams immediately; hold it until resume().
        if let Err(e) = stream.pause() {
            warn!(target: "audio", error = %e, "stream cannot pause, starting live");
        }

        info!(target: "audio", device = %name, sample_rate, channels, "output device opened");
        Ok(CpalGraph { stream, voices, running: false, sample_rate, channels, warned_lost: false })
    }

    pub fn sample_rate(&self) -> u32 { self.sample_rate }
    pub fn channels(&self) -> u16 { self.channels }
}

impl AudioGraph for CpalGraph {
    fn trigger(&mut self, frequency: f32) {
        queue_voice(&self.voices, frequency, &mut self.warned_lost);
    }

    fn resume(&mut self) -> Result<(), SynthError> {
        self.stream.play().map_err(|e| SynthError::Stream(e.to_string()))?;
        self.running = true;
        Ok(())
    }

    fn is_running(&self) -> bool { self.running }
}

/// Hand a voice to the device callback.  Returns false, warning once, when
/// the callback has gone away.
fn queue_voice(voices: &Sender<f32>, frequency: f32, warned: &mut bool) -> bool {
    if voices.send(frequency).is_ok() {
        return true;
    }
    if !*warned {
        warn!(target: "audio", frequency, "output stream is gone, dropping plucks");
        *warned = true;
    }
    false
}

/// The real-time callback: start queued voices, then render.
fn device_callback(
    mut mixer: Mixer,
    voices:    Receiver<f32>,
    channels:  usize,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        while let Ok(hz) = voices.try_recv() {
            mixer.trigger(hz);
        }
        mixer.render(data, channels);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
