//! string_installation — interactive entry point.

use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pluck_synth::{PitchRange, ReverbSettings, SynthSettings, Waveform};
use string_installation::app::{run, InstallationConfig};
use string_installation::pipeline::PipelineConfig;
use string_installation::tracker::TrackerKind;

#[derive(Parser, Debug)]
#[command(name = "string_installation", about = "Pluck a string stretched between two hands")]
struct Args {
    /// Hand source: `scripted`, `stdin`, `leap`, or a JSON-lines file path.
    #[arg(long, default_value = "scripted")]
    tracker: TrackerKind,

    #[arg(long, default_value_t = 1280)]
    width: usize,

    #[arg(long, default_value_t = 720)]
    height: usize,

    /// Frames a ripple stays on screen.
    #[arg(long, default_value_t = 60)]
    max_age: u32,

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

    #[arg(long, default_value_t = 4.0)]
    string_width: f32,

    #[arg(long, default_value_t = 15.0)]
    string_glow: f32,

    /// Mirror plucks to a MIDI port; an optional name fragment picks the port.
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    midi: Option<String>,

    /// Start audio immediately instead of waiting for Space.
    #[arg(long)]
    autostart: bool,

    /// Scripted hands with audio started.
    #[arg(long)]
    quick: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║         String Installation — Pluck the Air Between          ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion available  (--tracker leap)");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Scripted / recorded hands  (use --features leap for hardware)");
    println!();

    let cfg = config_from(args);
    if cfg.autostart {
        println!("  Audio starts immediately.");
    } else {
        println!("  Press SPACE in the window to start audio; Esc or Q quits.");
    }
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn config_from(args: Args) -> InstallationConfig {
    let mut pipeline = PipelineConfig::default();
    pipeline.ripples.max_age = args.max_age;
    pipeline.string.width = args.string_width;
    pipeline.string.glow = args.string_glow;

    let synth = SynthSettings {
        pitch: PitchRange::new(args.freq_base, args.freq_range, args.freq_step),
        reverb: ReverbSettings {
            duration_s: args.reverb_duration,
            decay: args.reverb_decay,
            ..ReverbSettings::default()
        },
        waveform: if args.sine { Waveform::Sine } else { Waveform::Triangle },
        ..SynthSettings::default()
    };

    let tracker = if args.quick { TrackerKind::Scripted } else { args.tracker };

    InstallationConfig {
        width: args.width,
        height: args.height,
        pipeline,
        synth,
        tracker,
        midi_port: args.midi,
        autostart: args.autostart || args.quick,
        ..InstallationConfig::default()
    }
}
