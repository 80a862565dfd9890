//! pluck_replay — run recorded hand frames through the crossing detector.
//!
//! Reads one `HandFrame` JSON object per line (from a file or stdin) and
//! prints every pluck the detector would have fired.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pluck_core::{extract, CrossingDetector, ExtractorConfig, HandFrame, SurfaceSize};

#[derive(Parser, Debug)]
#[command(name = "pluck_replay", about = "Replay JSON-lines hand frames and list plucks")]
struct Args {
    /// Input file; stdin when omitted.
    input: Option<PathBuf>,

    /// Surface width used to scale landmarks.
    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    /// Surface height used to scale landmarks.
    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Landmark index of the string ends.
    #[arg(long, default_value_t = pluck_core::landmarks::index::INDEX_FINGER_TIP)]
    anchor: usize,

    /// Landmark index of the plucking fingertip.
    #[arg(long, default_value_t = pluck_core::landmarks::index::THUMB_TIP)]
    plucker: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                eprintln!("Error: cannot open {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Box::new(BufReader::new(io::stdin())),
    };

    let size = SurfaceSize::new(args.width, args.height);
    let cfg = ExtractorConfig { anchor_landmark: args.anchor, plucker_landmark: args.plucker };
    let mut detector = CrossingDetector::new();
    let mut total = 0usize;

    for (frame_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(frame_no, error = %e, "read failed, stopping");
                break;
            }
        };
        if line.trim().is_empty() { continue; }

        let frame = match HandFrame::from_json(&line) {
            Ok(f) => f,
            Err(e) => {
                warn!(frame_no, error = %e, "skipping malformed frame");
                continue;
            }
        };

        let extraction = extract(&frame, size, &cfg);
        for ev in detector.detect(&extraction, size) {
            total += 1;
            println!(
                "frame {:>6}  slot {}  at ({:>7.1}, {:>7.1})  position {:.3}",
                frame_no, ev.slot, ev.point.x, ev.point.y, ev.normalized_position
            );
        }
    }

    println!("{} pluck(s)", total);
}
