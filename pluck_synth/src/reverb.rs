//! Synthetic impulse response and the partitioned FFT convolver.
//!
//! The impulse response is decaying stereo noise:
//!
//! ```text
//!   ir[c][i] = (2u − 1) · (1 − i / len) ^ decay        u ~ U(0, 1)
//! ```
//!
//! Convolution uses uniformly partitioned overlap-save: the response is cut
//! into `block`-sized partitions, each transformed once, and every input
//! block is multiplied against a delay line of past input spectra.  Cost
//! per block is one forward FFT plus one inverse FFT per output channel.

use std::sync::Arc;

use rand::Rng;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

// ════════════════════════════════════════════════════════════════════════════
// Impulse response
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReverbSettings {
    /// Impulse-response length in seconds.
    pub duration_s: f32,
    /// Exponent of the `(1 − i/len)` fade.
    pub decay:      f32,
    /// Gain of the reverb send.
    pub wet:        f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        ReverbSettings { duration_s: 2.0, decay: 2.0, wet: 0.35 }
    }
}

/// Stereo impulse response.
#[derive(Clone, Debug)]
pub struct ReverbImpulse {
    pub left:  Vec<f32>,
    pub right: Vec<f32>,
}

impl ReverbImpulse {
    pub fn generate<R: Rng>(settings: &ReverbSettings, sample_rate: f32, rng: &mut R) -> Self {
        let len = (settings.duration_s.max(0.0) * sample_rate) as usize;
        let mut channel = || -> Vec<f32> {
            (0..len)
                .map(|i| {
                    let noise = rng.random::<f32>() * 2.0 - 1.0;
                    noise * (1.0 - i as f32 / len as f32).powf(settings.decay)
                })
                .collect()
        };
        let left = channel();
        let right = channel();
        ReverbImpulse { left, right }
    }

    pub fn len(&self) -> usize { self.left.len() }
    pub fn is_empty(&self) -> bool { self.left.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// Convolver
// ════════════════════════════════════════════════════════════════════════════

/// Mono-in, multi-channel-out block convolver.
pub struct Convolver {
    block:      usize,
    forward:    Arc<dyn Fft<f32>>,
    inverse:    Arc<dyn Fft<f32>>,
    /// `partitions[channel][p]`: spectrum of the p-th response partition.
    partitions: Vec<Vec<Vec<Complex<f32>>>>,
    /// Ring of past input spectra; `history[head]` is the newest.
    history:    Vec<Vec<Complex<f32>>>,
    head:       usize,
    /// Previous input block followed by the current one.
    window:     Vec<f32>,
    spectrum:   Vec<Complex<f32>>,
    scratch:    Vec<Complex<f32>>,
    outputs:    Vec<Vec<f32>>,
}

impl std::fmt::Debug for Convolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Convolver")
            .field("block", &self.block)
            .field("channels", &self.partitions.len())
            .field("partitions", &self.history.len())
            .finish()
    }
}

impl Convolver {
    /// One output channel per entry of `responses`.  `block` is the number
    /// of samples consumed and produced by each [`Convolver::process`].
    pub fn new(responses: &[&[f32]], block: usize) -> Self {
        let block = block.max(1);
        let n = 2 * block;
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);

        let longest = responses.iter().map(|r| r.len()).max().unwrap_or(0);
        let count = longest.div_ceil(block).max(1);

        let mut scratch = vec![Complex::default(); forward.get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len())];

        let partitions = responses
            .iter()
            .map(|ir| {
                (0..count)
                    .map(|p| {
                        let mut buf = vec![Complex::default(); n];
                        let start = (p * block).min(ir.len());
                        let end = ((p + 1) * block).min(ir.len());
                        for (slot, &s) in buf.iter_mut().zip(&ir[start..end]) {
                            slot.re = s;
                        }
                        forward.process_with_scratch(&mut buf, &mut scratch);
                        buf
                    })
                    .collect()
            })
            .collect();

        Convolver {
            block,
            forward,
            inverse,
            partitions,
            history: vec![vec![Complex::default(); n]; count],
            head: 0,
            window: vec![0.0; n],
            spectrum: vec![Complex::default(); n],
            scratch,
            outputs: vec![vec![0.0; block]; responses.len()],
        }
    }

    pub fn block_len(&self) -> usize { self.block }
    pub fn channels(&self) -> usize { self.outputs.len() }

    /// Convolve the next `block` input samples.  Shorter input is
    /// zero-padded.  Returns one slice of `block` samples per channel.
    pub fn process(&mut self, input: &[f32]) -> &[Vec<f32>] {
        let b = self.block;
        let n = 2 * b;

        self.window.copy_within(b.., 0);
        for (i, slot) in self.window[b..].iter_mut().enumerate() {
            *slot = input.get(i).copied().unwrap_or(0.0);
        }

        let count = self.history.len();
        self.head = (self.head + 1) % count;
        {
            let newest = &mut self.history[self.head];
            for (c, &s) in newest.iter_mut().zip(&self.window) {
                *c = Complex::new(s, 0.0);
            }
            self.forward.process_with_scratch(newest, &mut self.scratch);
        }

        let scale = 1.0 / n as f32;
        for (ch, parts) in self.partitions.iter().enumerate() {
            self.spectrum.iter_mut().for_each(|c| *c = Complex::default());
            for (p, part) in parts.iter().enumerate() {
                let past = &self.history[(self.head + count - p) % count];
                for ((acc, x), h) in self.spectrum.iter_mut().zip(past).zip(part) {
                    *acc += x * h;
                }
            }
            self.inverse.process_with_scratch(&mut self.spectrum, &mut self.scratch);
            for (out, c) in self.outputs[ch].iter_mut().zip(&self.spectrum[b..]) {
                *out = c.re * scale;
            }
        }

        &self.outputs
    }

    /// Drop all convolution tails.
    pub fn reset(&mut self) {
        self.window.iter_mut().for_each(|s| *s = 0.0);
        for h in &mut self.history {
            h.iter_mut().for_each(|c| *c = Complex::default());
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn direct(input: &[f32], ir: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; input.len() + ir.len()];
        for (i, &x) in input.iter().enumerate() {
            for (j, &h) in ir.iter().enumerate() {
                out[i + j] += x * h;
            }
        }
        out
    }

    fn run(conv: &mut Convolver, input: &[f32], total: usize) -> Vec<Vec<f32>> {
        let b = conv.block_len();
        let mut out = vec![Vec::new(); conv.channels()];
        let mut pos = 0;
        while pos < total {
            let end = (pos + b).min(input.len());
            let chunk = if pos < input.len() { &input[pos..end] } else { &[][..] };
            for (ch, o) in conv.process(chunk).iter().enumerate() {
                out[ch].extend_from_slice(o);
            }
            pos += b;
        }
        out
    }

    // ── impulse response ──────────────────────────────────────────────────
    #[test]
    fn impulse_length_and_envelope() {
        let mut rng = SmallRng::seed_from_u64(1);
        let s = ReverbSettings { duration_s: 0.5, decay: 2.0, wet: 0.3 };
        let ir = ReverbImpulse::generate(&s, 1000.0, &mut rng);
        assert_eq!(ir.len(), 500);
        assert_eq!(ir.right.len(), 500);
        for (i, &v) in ir.left.iter().enumerate() {
            let bound = (1.0 - i as f32 / 500.0).powf(2.0);
            assert!(v.abs() <= bound + 1e-6);
        }
        assert_ne!(ir.left, ir.right);
    }

    #[test]
    fn impulse_tail_is_quieter_than_head() {
        let mut rng = SmallRng::seed_from_u64(2);
        let ir = ReverbImpulse::generate(&ReverbSettings::default(), 8000.0, &mut rng);
        let energy = |s: &[f32]| s.iter().map(|v| v * v).sum::<f32>();
        let quarter = ir.len() / 4;
        assert!(energy(&ir.left[..quarter]) > 10.0 * energy(&ir.left[3 * quarter..]));
    }

    #[test]
    fn zero_duration_is_empty() {
        let mut rng = SmallRng::seed_from_u64(3);
        let s = ReverbSettings { duration_s: 0.0, ..ReverbSettings::default() };
        assert!(ReverbImpulse::generate(&s, 48_000.0, &mut rng).is_empty());
    }

    // ── convolver ─────────────────────────────────────────────────────────
    #[test]
    fn unit_impulse_reproduces_response() {
        let ir: Vec<f32> = (0..10).map(|i| (i as f32 + 1.0) * 0.1).collect();
        let mut conv = Convolver::new(&[&ir], 4);
        let out = run(&mut conv, &[1.0], 16);
        for (i, &h) in ir.iter().enumerate() {
            assert!((out[0][i] - h).abs() < 1e-4, "tap {}: {} vs {}", i, out[0][i], h);
        }
        for &v in &out[0][10..] {
            assert!(v.abs() < 1e-4);
        }
    }

    #[test]
    fn matches_direct_convolution() {
        let ir_l: Vec<f32> = (0..23).map(|i| ((i * 7 % 11) as f32 - 5.0) * 0.05).collect();
        let ir_r: Vec<f32> = (0..17).map(|i| ((i * 3 % 5) as f32 - 2.0) * 0.1).collect();
        let input: Vec<f32> = (0..37).map(|i| ((i * 13 % 9) as f32 - 4.0) * 0.1).collect();

        let mut conv = Convolver::new(&[&ir_l, &ir_r], 8);
        let out = run(&mut conv, &input, 64);

        let want_l = direct(&input, &ir_l);
        let want_r = direct(&input, &ir_r);
        for i in 0..want_l.len().min(64) {
            assert!((out[0][i] - want_l[i]).abs() < 1e-4, "L[{}]", i);
        }
        for i in 0..want_r.len().min(64) {
            assert!((out[1][i] - want_r[i]).abs() < 1e-4, "R[{}]", i);
        }
    }

    #[test]
    fn empty_response_is_silent() {
        let mut conv = Convolver::new(&[&[]], 4);
        let out = run(&mut conv, &[1.0, 2.0, 3.0], 8);
        assert!(out[0].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn reset_drops_tail() {
        let ir = vec![1.0; 12];
        let mut conv = Convolver::new(&[&ir], 4);
        conv.process(&[1.0, 1.0, 1.0, 1.0]);
        conv.reset();
        let out = conv.process(&[]);
        assert!(out[0].iter().all(|v| v.abs() < 1e-6));
    }
}
