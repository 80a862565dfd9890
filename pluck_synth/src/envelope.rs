//! Attack/decay gain envelope.

/// Linear rise to `peak` over `attack_s`, then an exponential fall to
/// `floor` over `decay_s`.  The voice stops when the decay ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    pub attack_s: f32,
    pub decay_s:  f32,
    pub peak:     f32,
    /// Gain reached at the end of the decay; must be > 0 for the
    /// exponential ramp.
    pub floor:    f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope { attack_s: 0.010, decay_s: 1.5, peak: 0.4, floor: 0.001 }
    }
}

impl Envelope {
    /// Total length of a voice in seconds.
    pub fn duration(&self) -> f32 { self.attack_s + self.decay_s }

    /// Gain at `t` seconds after the trigger; 0 before 0 and after the end.
    pub fn gain_at(&self, t: f32) -> f32 {
        if t < 0.0 || t >= self.duration() {
            return 0.0;
        }
        if t < self.attack_s {
            return self.peak * t / self.attack_s;
        }
        if self.decay_s <= 0.0 || self.peak <= 0.0 {
            return self.peak;
        }
        let f = (t - self.attack_s) / self.decay_s;
        self.peak * (self.floor / self.peak).powf(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool { (a - b).abs() < 1e-5 }

    #[test]
    fn starts_silent_and_peaks_after_attack() {
        let e = Envelope::default();
        assert_eq!(e.gain_at(0.0), 0.0);
        assert!(close(e.gain_at(0.005), 0.2));
        assert!(close(e.gain_at(0.010), 0.4));
    }

    #[test]
    fn decays_to_floor() {
        let e = Envelope::default();
        let near_end = e.gain_at(e.duration() - 1e-4);
        assert!(near_end < 0.0011);
        assert!(near_end >= 0.001);
        assert_eq!(e.gain_at(e.duration()), 0.0);
    }

    #[test]
    fn decay_is_exponential() {
        let e = Envelope::default();
        // halfway through the decay the gain is the geometric mean
        let mid = e.gain_at(e.attack_s + e.decay_s / 2.0);
        assert!(close(mid, (0.4f32 * 0.001).sqrt()));
    }

    #[test]
    fn decay_never_rises() {
        let e = Envelope::default();
        let mut last = e.gain_at(e.attack_s);
        let mut t = e.attack_s;
        while t < e.duration() {
            let g = e.gain_at(t);
            assert!(g <= last + 1e-7);
            last = g;
            t += 0.01;
        }
    }

    #[test]
    fn zero_attack_jumps_to_peak() {
        let e = Envelope { attack_s: 0.0, ..Envelope::default() };
        assert!(close(e.gain_at(0.0), 0.4));
    }

    #[test]
    fn negative_time_is_silent() {
        assert_eq!(Envelope::default().gain_at(-1.0), 0.0);
    }
}
