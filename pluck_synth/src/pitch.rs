//! Position → frequency mapping.

/// Linear frequency range with grid quantisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitchRange {
    /// Frequency at position 0.0 (Hz).
    pub base_hz:  f32,
    /// Added at position 1.0 (Hz).
    pub range_hz: f32,
    /// Grid spacing; 0 disables quantisation.
    pub step_hz:  f32,
}

impl Default for PitchRange {
    fn default() -> Self {
        PitchRange { base_hz: 200.0, range_hz: 600.0, step_hz: 50.0 }
    }
}

impl PitchRange {
    pub fn new(base_hz: f32, range_hz: f32, step_hz: f32) -> Self {
        PitchRange { base_hz, range_hz, step_hz }
    }

    /// Unquantised frequency for a position.  Positions are clamped to
    /// 0.0–1.0; `NaN` maps to the base frequency.
    pub fn raw_frequency(&self, position: f32) -> f32 {
        let pos = if position.is_nan() { 0.0 } else { position.clamp(0.0, 1.0) };
        self.base_hz + pos * self.range_hz
    }

    /// Snap to the nearest multiple of `step_hz`.
    pub fn quantize(&self, hz: f32) -> f32 {
        if self.step_hz > 0.0 {
            (hz / self.step_hz).round() * self.step_hz
        } else {
            hz
        }
    }

    pub fn frequency_for(&self, position: f32) -> f32 {
        self.quantize(self.raw_frequency(position))
    }
}

/// Nearest MIDI note number (A4 = 440 Hz = 69), clamped to 0–127.
pub fn midi_note_for(hz: f32) -> u8 {
    if !(hz > 0.0) {
        return 0;
    }
    let note = 69.0 + 12.0 * (hz / 440.0).log2();
    note.round().clamp(0.0, 127.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extremes_map_to_range_ends() {
        let p = PitchRange::default();
        assert_eq!(p.frequency_for(0.0), 200.0);
        assert_eq!(p.frequency_for(1.0), 800.0);
    }

    #[test]
    fn midpoint_and_rounding() {
        let p = PitchRange::default();
        assert_eq!(p.frequency_for(0.5), 500.0);
        // 200 + 0.51 * 600 = 506 → 500
        assert_eq!(p.frequency_for(0.51), 500.0);
        // 200 + 0.545 * 600 = 527 → 550
        assert_eq!(p.frequency_for(0.545), 550.0);
    }

    #[test]
    fn out_of_range_positions_clamp() {
        let p = PitchRange::default();
        assert_eq!(p.frequency_for(-3.0), 200.0);
        assert_eq!(p.frequency_for(7.0), 800.0);
        assert_eq!(p.frequency_for(f32::NAN), 200.0);
    }

    #[test]
    fn zero_step_disables_grid() {
        let p = PitchRange::new(200.0, 600.0, 0.0);
        assert!((p.frequency_for(0.51) - 506.0).abs() < 1e-3);
    }

    #[test]
    fn midi_notes() {
        assert_eq!(midi_note_for(440.0), 69);
        assert_eq!(midi_note_for(220.0), 57);
        assert_eq!(midi_note_for(261.63), 60);
        assert_eq!(midi_note_for(0.0), 0);
        assert_eq!(midi_note_for(1.0e9), 127);
    }

    proptest! {
        #[test]
        fn output_is_on_grid_and_in_range(pos in -2.0f32..3.0) {
            let p = PitchRange::default();
            let f = p.frequency_for(pos);
            prop_assert!((200.0..=800.0).contains(&f));
            prop_assert_eq!((f / 50.0).fract(), 0.0);
        }

        #[test]
        fn monotonic_in_position(a in 0.0f32..1.0, b in 0.0f32..1.0) {
            let p = PitchRange::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(p.frequency_for(lo) <= p.frequency_for(hi));
        }
    }
}
