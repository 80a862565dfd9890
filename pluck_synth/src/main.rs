//! pluck_render — render plucks offline to a WAV file.
//!
//! ```text
//! pluck_render 0.0 0.5 1.0 --spacing 0.4 -o arpeggio.wav
//! ```

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pluck_synth::{AudioEngine, OfflineBackend, PitchRange, ReverbSettings, SynthSettings, Waveform};

#[derive(Parser, Debug)]
#[command(name = "pluck_render", about = "Render plucked tones at given string positions to WAV")]
struct Args {
    /// Normalised pluck positions (0.0–1.0), played in order.
    #[arg(required = true, allow_negative_numbers = true)]
    positions: Vec<f32>,

    /// Output path.
    #[arg(short, long, default_value = "plucks.wav")]
    output: PathBuf,

    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    /// Seconds between successive plucks.
    #[arg(long, default_value_t = 0.5)]
    spacing: f32,

    /// Silence rendered after the last pluck, in seconds.
    #[arg(long, default_value_t = 3.0)]
    tail: f32,

    #[arg(long, default_value_t = 200.0)]
    freq_base: f32,

    #[arg(long, default_value_t = 600.0)]
    freq_range: f32,

    #[arg(long, default_value_t = 50.0)]
    freq_step: f32,

    #[arg(long, default_value_t = 2.0)]
    reverb_duration: f32,

    #[arg(long, default_value_t = 2.0)]
    reverb_decay: f32,

    /// Use a sine instead of a triangle oscillator.
    #[arg(long)]
    sine: bool,

    /// Fix the reverb noise for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let settings = SynthSettings {
        pitch: PitchRange::new(args.freq_base, args.freq_range, args.freq_step),
        reverb: ReverbSettings {
            duration_s: args.reverb_duration,
            decay: args.reverb_decay,
            ..ReverbSettings::default()
        },
        waveform: if args.sine { Waveform::Sine } else { Waveform::Triangle },
        ..SynthSettings::default()
    };

    let mut engine = AudioEngine::new(settings, OfflineBackend::new(args.sample_rate as f32));
    if let Some(seed) = args.seed {
        engine = engine.with_seed(seed);
    }
    if let Err(e) = engine.initialize().and_then(|_| engine.resume()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let spacing = (args.spacing.max(0.0) * args.sample_rate as f32) as usize;
    let tail = (args.tail.max(0.0) * args.sample_rate as f32) as usize;
    let mut samples = Vec::new();

    for (i, &pos) in args.positions.iter().enumerate() {
        if let Some(hz) = engine.play_pluck(pos) {
            info!(pluck = i, position = pos, hz, "pluck");
        }
        if i + 1 < args.positions.len() {
            if let Some(graph) = engine.graph_mut() {
                samples.extend(graph.render(spacing));
            }
        }
    }
    if let Some(graph) = engine.graph_mut() {
        samples.extend(graph.render(tail));
    }
    engine.close();

    match pluck_synth::wav::write_file(&args.output, &samples, 2, args.sample_rate) {
        Ok(()) => println!(
            "Wrote {:.2} s of audio to '{}'",
            samples.len() as f32 / 2.0 / args.sample_rate as f32,
            args.output.display()
        ),
        Err(e) => {
            eprintln!("Error: cannot write {}: {}", args.output.display(), e);
            std::process::exit(1);
        }
    }
}
