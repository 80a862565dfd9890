//! A single self-terminating plucked tone.

use std::f32::consts::TAU;

use crate::envelope::Envelope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    #[default]
    Triangle,
}

impl Waveform {
    /// One sample at `phase` (0.0–1.0 of a cycle), range −1.0–1.0.
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine     => (phase * TAU).sin(),
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        }
    }
}

/// Oscillator plus envelope.  Yields samples until the envelope ends.
#[derive(Clone, Debug)]
pub struct Voice {
    frequency:   f32,
    sample_rate: f32,
    waveform:    Waveform,
    envelope:    Envelope,
    phase:       f32,
    elapsed:     u64,
    length:      u64,
}

impl Voice {
    pub fn new(frequency: f32, sample_rate: f32, waveform: Waveform, envelope: Envelope) -> Self {
        let length = (envelope.duration().max(0.0) * sample_rate).ceil() as u64;
        Voice {
            frequency,
            sample_rate,
            waveform,
            envelope,
            phase: 0.0,
            elapsed: 0,
            length,
        }
    }

    pub fn frequency(&self) -> f32 { self.frequency }

    pub fn is_finished(&self) -> bool { self.elapsed >= self.length }

    /// Total samples this voice produces.
    pub fn len_samples(&self) -> u64 { self.length }

    /// Next sample, or `None` once the envelope has run out.
    pub fn next_sample(&mut self) -> Option<f32> {
        if self.is_finished() {
            return None;
        }
        let t = self.elapsed as f32 / self.sample_rate;
        let out = self.waveform.sample(self.phase) * self.envelope.gain_at(t);

        self.phase += self.frequency / self.sample_rate;
        self.phase -= self.phase.floor();
        self.elapsed += 1;
        Some(out)
    }
}

impl Iterator for Voice {
    type Item = f32;
    fn next(&mut self) -> Option<f32> { self.next_sample() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_shape() {
        assert_eq!(Waveform::Triangle.sample(0.0), 1.0);
        assert_eq!(Waveform::Triangle.sample(0.5), -1.0);
        assert_eq!(Waveform::Triangle.sample(0.25), 0.0);
    }

    #[test]
    fn voice_terminates_after_envelope() {
        let env = Envelope { attack_s: 0.25, decay_s: 0.25, ..Envelope::default() };
        let v = Voice::new(440.0, 1000.0, Waveform::Sine, env);
        assert_eq!(v.len_samples(), 500);
        assert_eq!(v.count(), 500);
    }

    #[test]
    fn voice_peak_bounded_by_envelope() {
        let env = Envelope::default();
        let v = Voice::new(300.0, 8000.0, Waveform::Triangle, env);
        let peak = v.map(f32::abs).fold(0.0f32, f32::max);
        assert!(peak <= env.peak + 1e-6);
        assert!(peak > env.peak * 0.8);
    }

    #[test]
    fn independent_voices_do_not_share_state() {
        let env = Envelope::default();
        let mut a = Voice::new(200.0, 8000.0, Waveform::Sine, env);
        let b = Voice::new(200.0, 8000.0, Waveform::Sine, env);
        for _ in 0..500 { a.next_sample(); }
        let fresh: Vec<f32> = b.take(10).collect();
        let c: Vec<f32> = Voice::new(200.0, 8000.0, Waveform::Sine, env).take(10).collect();
        assert_eq!(fresh, c);
    }
}
