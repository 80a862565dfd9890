//! Voice summing, reverb send and master gain.
//!
//! ```text
//!   voice ─┬─────────────────────────────┐
//!   voice ─┤ dry                          ├──▶ master gain ──▶ L / R
//!   voice ─┴─▶ send ──▶ convolver (L, R) ─┘
//! ```
//!
//! Rendering happens in fixed blocks (the convolver's block size); output
//! requests of any length are served from the last rendered block.

use rand::Rng;
use tracing::debug;

use crate::envelope::Envelope;
use crate::reverb::{Convolver, ReverbImpulse, ReverbSettings};
use crate::voice::{Voice, Waveform};

/// Samples per internal render block.
pub const BLOCK: usize = 256;

#[derive(Debug)]
pub struct Mixer {
    sample_rate: f32,
    waveform:    Waveform,
    envelope:    Envelope,
    wet:         f32,
    master_gain: f32,
    voices:      Vec<Voice>,
    reverb:      Convolver,
    dry:         Vec<f32>,
    send:        Vec<f32>,
    /// Interleaved stereo frames of the current block.
    pending:     Vec<f32>,
    cursor:      usize,
}

impl Mixer {
    pub fn new(
        sample_rate: f32,
        waveform:    Waveform,
        envelope:    Envelope,
        reverb:      &ReverbSettings,
        master_gain: f32,
        rng:         &mut impl Rng,
    ) -> Self {
        let ir = ReverbImpulse::generate(reverb, sample_rate, rng);
        debug!(sample_rate, ir_len = ir.len(), "reverb impulse generated");
        Mixer {
            sample_rate,
            waveform,
            envelope,
            wet: reverb.wet,
            master_gain,
            voices: Vec::new(),
            reverb: Convolver::new(&[&ir.left, &ir.right], BLOCK),
            dry: vec![0.0; BLOCK],
            send: vec![0.0; BLOCK],
            pending: Vec::with_capacity(BLOCK * 2),
            cursor: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 { self.sample_rate }

    /// Voices still sounding.
    pub fn active_voices(&self) -> usize { self.voices.len() }

    /// Start an independent voice at `frequency`.
    pub fn trigger(&mut self, frequency: f32) {
        self.voices.push(Voice::new(frequency, self.sample_rate, self.waveform, self.envelope));
    }

    /// Fill `out` with interleaved frames of `channels` channels.  Mono
    /// output gets the average of L and R; channels past the second are
    /// silent.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            if self.cursor >= self.pending.len() {
                self.render_block();
            }
            let l = self.pending[self.cursor];
            let r = self.pending[self.cursor + 1];
            self.cursor += 2;

            match frame {
                [mono] => *mono = 0.5 * (l + r),
                [left, right, rest @ ..] => {
                    *left = l;
                    *right = r;
                    rest.iter_mut().for_each(|s| *s = 0.0);
                }
                [] => {}
            }
        }
    }

    /// Convenience: `frames` stereo frames into a new buffer.
    pub fn render_stereo(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * 2];
        self.render(&mut out, 2);
        out
    }

    fn render_block(&mut self) {
        self.dry.iter_mut().for_each(|s| *s = 0.0);
        for voice in &mut self.voices {
            for s in self.dry.iter_mut() {
                match voice.next_sample() {
                    Some(v) => *s += v,
                    None => break,
                }
            }
        }
        let before = self.voices.len();
        self.voices.retain(|v| !v.is_finished());
        if self.voices.len() != before {
            debug!(finished = before - self.voices.len(), active = self.voices.len(), "voices ended");
        }

        for (send, dry) in self.send.iter_mut().zip(&self.dry) {
            *send = dry * self.wet;
        }
        let wet = self.reverb.process(&self.send);

        self.pending.clear();
        for i in 0..BLOCK {
            self.pending.push(self.master_gain * (self.dry[i] + wet[0][i]));
            self.pending.push(self.master_gain * (self.dry[i] + wet[1][i]));
        }
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn mixer(reverb: ReverbSettings) -> Mixer {
        let mut rng = SmallRng::seed_from_u64(11);
        Mixer::new(8000.0, Waveform::Sine, Envelope::default(), &reverb, 0.8, &mut rng)
    }

    fn peak(buf: &[f32]) -> f32 { buf.iter().map(|v| v.abs()).fold(0.0, f32::max) }

    #[test]
    fn silent_without_voices() {
        let mut m = mixer(ReverbSettings::default());
        assert_eq!(peak(&m.render_stereo(1000)), 0.0);
    }

    #[test]
    fn voice_sounds_then_ends() {
        let mut m = mixer(ReverbSettings { duration_s: 0.1, ..ReverbSettings::default() });
        m.trigger(400.0);
        assert_eq!(m.active_voices(), 1);
        let head = m.render_stereo(800);
        assert!(peak(&head) > 0.1);
        // 1.51 s of voice at 8 kHz
        m.render_stereo(12_100);
        assert_eq!(m.active_voices(), 0);
    }

    #[test]
    fn concurrent_voices_are_independent() {
        let dry = ReverbSettings { duration_s: 0.0, wet: 0.0, ..ReverbSettings::default() };
        let mut one = mixer(dry);
        one.trigger(300.0);
        let single = one.render_stereo(512);

        let mut two = mixer(dry);
        two.trigger(300.0);
        two.trigger(300.0);
        let double = two.render_stereo(512);

        for (a, b) in single.iter().zip(&double) {
            assert!((2.0 * a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn reverb_tail_outlives_voice() {
        let mut m = mixer(ReverbSettings { duration_s: 1.0, decay: 1.0, wet: 0.5 });
        m.trigger(500.0);
        m.render_stereo(12_100);
        assert_eq!(m.active_voices(), 0);
        // the send keeps ringing for a while after the voice stops
        let tail = m.render_stereo(1024);
        assert!(peak(&tail) > 0.0);
    }

    #[test]
    fn mono_and_multichannel_layouts() {
        let dry = ReverbSettings { duration_s: 0.0, wet: 0.0, ..ReverbSettings::default() };
        let mut m = mixer(dry);
        m.trigger(300.0);
        let mut quad = vec![1.0; 400];
        m.render(&mut quad, 4);
        for frame in quad.chunks(4) {
            assert_eq!(frame[0], frame[1]);
            assert_eq!(frame[2], 0.0);
            assert_eq!(frame[3], 0.0);
        }

        let mut m = mixer(dry);
        m.trigger(300.0);
        let mut mono = vec![0.0; 100];
        m.render(&mut mono, 1);
        assert!(peak(&mono) > 0.0);
    }
}
