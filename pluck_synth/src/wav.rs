//! 16-bit PCM WAV serialisation for offline renders.

use std::io::{self, Write};
use std::path::Path;

/// Interleaved float samples in −1.0–1.0 as a canonical RIFF/WAVE file.
/// Out-of-range samples are clipped.  Fails when the data would not fit
/// the 32-bit RIFF size fields.
pub fn to_bytes(samples: &[f32], channels: u16, sample_rate: u32) -> io::Result<Vec<u8>> {
    let channels = channels.max(1);
    let block_align = channels * 2;
    let data_len = data_chunk_len(samples.len())?;

    let mut out = Vec::with_capacity(44 + samples.len() * 2);
    // ── RIFF header ───────────────────────────────────────────────────────
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // ── fmt chunk ─────────────────────────────────────────────────────────
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    // ── data chunk ────────────────────────────────────────────────────────
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    Ok(out)
}

/// Byte length of the data chunk for `sample_count` 16-bit samples.
fn data_chunk_len(sample_count: usize) -> io::Result<u32> {
    sample_count
        .checked_mul(2)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| n.checked_add(36).is_some())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} samples exceed the 4 GiB WAV limit", sample_count),
            )
        })
}

pub fn write_file(
    path:        impl AsRef<Path>,
    samples:     &[f32],
    channels:    u16,
    sample_rate: u32,
) -> io::Result<()> {
    let bytes = to_bytes(samples, channels, sample_rate)?;
    let mut f = std::fs::File::create(path)?;
    f.write_all(&bytes)
}
