//! # Musical Tuning Module
//!
//! Maps a frequency onto the nearest note of the twelve-tone equal
//! temperament scale and measures the deviation in cents.
//!
//! Semitones are numbered the MIDI way: A4 (concert pitch) is 69 and middle C
//! is 60. Octaves follow scientific pitch notation, so the octave number
//! changes at C.

use crate::config::CONCERT_PITCH;

/// Chromatic note names, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitone number of A4.
const A4_SEMITONE: i32 = 69;

/// Nearest equal-tempered note for a measured frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteAssignment {
    /// Note name from [`NOTE_NAMES`].
    pub note: &'static str,
    pub octave: i32,
    /// Rounded semitone number (MIDI numbering, A4 = 69).
    pub semitone: i32,
    /// Deviation from the reference frequency; positive is sharp, negative flat.
    pub cents: f64,
    /// The frequency that was mapped, in Hz.
    pub frequency: f64,
    /// Equal-tempered frequency of the assigned note, in Hz.
    pub reference_frequency: f64,
}

impl NoteAssignment {
    /// Note name with octave, e.g. "A#4".
    pub fn label(&self) -> String {
        format!("{}{}", self.note, self.octave)
    }
}

/// Frequency-to-note mapper for a given concert pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMapper {
    concert_pitch: f64,
}

impl Default for NoteMapper {
    fn default() -> Self {
        Self::new(CONCERT_PITCH)
    }
}

impl NoteMapper {
    pub fn new(concert_pitch: f64) -> Self {
        Self { concert_pitch }
    }

    pub fn concert_pitch(&self) -> f64 {
        self.concert_pitch
    }

    /// Finds the nearest equal-tempered note to `frequency` and its cents deviation.
    ///
    /// Exact half-semitone boundaries round away from zero (`f64::round`), so a
    /// tone exactly 50 cents above A4 maps to A#4 at -50 cents.
    ///
    /// # Arguments
    /// * `frequency` - Detected fundamental in Hz, must be positive
    ///
    /// # Returns
    /// * The note name, octave, semitone number (A4 = 69), the cents deviation
    ///   (positive = sharp) and the reference frequency of that note
    pub fn map_to_note(&self, frequency: f64) -> NoteAssignment {
        let n = 12.0 * (frequency / self.concert_pitch).log2() + A4_SEMITONE as f64;
        let semitone = n.round() as i32;

        // Cents are always measured against the reference of this exact note.
        let reference_frequency = self.note_frequency(semitone);
        let cents = cents_between(frequency, reference_frequency);

        NoteAssignment {
            note: NOTE_NAMES[semitone.rem_euclid(12) as usize],
            octave: semitone.div_euclid(12) - 1,
            semitone,
            cents,
            frequency,
            reference_frequency,
        }
    }

    /// Equal-tempered frequency of a semitone number.
    pub fn note_frequency(&self, semitone: i32) -> f64 {
        self.concert_pitch * 2.0_f64.powf((semitone - A4_SEMITONE) as f64 / 12.0)
    }
}

/// Maps a frequency with the standard A4 = 440 Hz concert pitch.
pub fn map_to_note(frequency: f64) -> NoteAssignment {
    NoteMapper::default().map_to_note(frequency)
}

/// Deviation of `freq` from `target_freq` in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `target_freq` - Reference frequency in Hz
///
/// # Returns
/// * Cent deviation (positive = sharp, negative = flat)
pub fn cents_between(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn concert_pitch_is_a4() {
        let a = map_to_note(440.0);
        assert_eq!(a.note, "A");
        assert_eq!(a.octave, 4);
        assert_eq!(a.semitone, 69);
        assert!(a.cents.abs() < 1e-6);
        assert_relative_eq!(a.reference_frequency, 440.0, epsilon = 1e-9);
        assert_eq!(a.label(), "A4");
    }

    #[test]
    fn a_sharp_4() {
        let a = map_to_note(466.163_761_518_089_9);
        assert_eq!(a.note, "A#");
        assert_eq!(a.octave, 4);
        assert!(a.cents.abs() < 1e-6);
    }

    #[test]
    fn octave_changes_at_c() {
        let b3 = map_to_note(246.94);
        assert_eq!((b3.note, b3.octave), ("B", 3));
        let c4 = map_to_note(261.63);
        assert_eq!((c4.note, c4.octave), ("C", 4));
        assert_eq!(c4.semitone, 60);
    }

    #[test]
    fn semitone_round_trip() {
        for k in -57..=50 {
            let freq = 440.0 * 2.0_f64.powf(k as f64 / 12.0);
            let a = map_to_note(freq);
            let semitone = 69 + k;
            assert_eq!(a.semitone, semitone, "k = {k}");
            assert_eq!(a.note, NOTE_NAMES[semitone.rem_euclid(12) as usize]);
            assert_eq!(a.octave, semitone.div_euclid(12) - 1);
            assert!(a.cents.abs() < 1e-6, "k = {k}, cents = {}", a.cents);
        }
    }

    #[test]
    fn cents_sign_matches_frequency_offset() {
        for &freq in &[27.5, 81.0, 109.0, 111.0, 329.0, 331.0, 443.0, 437.0, 1234.5, 4186.0] {
            let a = map_to_note(freq);
            let diff = freq - a.reference_frequency;
            if diff.abs() > 1e-9 {
                assert_eq!(a.cents.signum(), diff.signum(), "freq = {freq}");
            }
            assert!(a.cents.abs() <= 50.0 + 1e-9);
        }
    }

    #[test]
    fn sharp_and_flat_deviation() {
        let sharp = map_to_note(445.0);
        assert_eq!(sharp.note, "A");
        assert_relative_eq!(sharp.cents, 19.56, epsilon = 0.01);

        let flat = map_to_note(435.0);
        assert_eq!(flat.note, "A");
        assert_relative_eq!(flat.cents, -19.79, epsilon = 0.01);
    }

    #[test]
    fn cents_stay_consistent_with_reference() {
        let a = map_to_note(300.0);
        assert_relative_eq!(a.cents, cents_between(a.frequency, a.reference_frequency));
    }

    #[test]
    fn custom_concert_pitch() {
        let mapper = NoteMapper::new(432.0);
        let a = mapper.map_to_note(432.0);
        assert_eq!((a.note, a.octave), ("A", 4));
        assert!(a.cents.abs() < 1e-9);

        let standard = mapper.map_to_note(440.0);
        assert_eq!(standard.note, "A");
        assert_relative_eq!(standard.cents, 31.77, epsilon = 0.01);
    }

    #[test]
    fn very_low_frequencies_use_negative_octaves() {
        let a = map_to_note(8.1758);
        assert_eq!((a.note, a.octave, a.semitone), ("C", -1, 0));
        let below = map_to_note(7.7);
        assert_eq!((below.note, below.octave, below.semitone), ("B", -2, -1));
    }

    #[test]
    fn half_semitone_rounds_up_to_next_note() {
        let a = map_to_note(440.0 * 2f64.powf(1.0 / 24.0));
        assert_eq!((a.note, a.octave), ("A#", 4));
        assert_relative_eq!(a.cents, -50.0, epsilon = 1e-9);
        assert_relative_eq!(a.reference_frequency, 466.1638, epsilon = 1e-3);
    }
}
