use bare_metal_modulo::{MNum, ModNumC};
use enum_iterator::{all, Sequence};

use crate::events::MidiPitch;

pub const NOTES_PER_OCTAVE: usize = 12;
const FIFTH: i32 = 7;

const MODE_NAMES: [&str; 7] = ["ionian", "dorian", "phrygian", "lydian", "mixolydian", "aeolian", "locrian"];

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Sequence)]
pub enum Mode {
    Ionian,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Aeolian,
    Locrian,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        MODE_NAMES[*self as usize]
    }

    /// Recognises a mode from the start of a K: field suffix, e.g. `m`,
    /// `min`, `Mix`, `dorian`. An empty suffix (or `maj`) is Ionian.
    pub fn from_abc(suffix: &str) -> Option<Mode> {
        let suffix = suffix.trim().to_lowercase();
        if suffix.is_empty() || suffix.starts_with("maj") {
            return Some(Mode::Ionian);
        }
        if suffix == "m" || suffix.starts_with("min") {
            return Some(Mode::Aeolian);
        }
        let prefix = suffix.get(..3)?;
        all::<Mode>().find(|m| m.name().starts_with(prefix))
    }

    /// Sharps this mode adds relative to the major key on the same tonic.
    fn sharps_from_major(&self) -> i32 {
        match self {
            Mode::Lydian => 1,
            Mode::Ionian => 0,
            Mode::Mixolydian => -1,
            Mode::Dorian => -2,
            Mode::Aeolian => -3,
            Mode::Phrygian => -4,
            Mode::Locrian => -5,
        }
    }
}

/// Sharps (negative for flats) in the key signature of `letter` (uppercase
/// A-G) raised or lowered by `accidental` semitones, in the given mode.
pub fn key_signature_sharps(letter: char, accidental: i32, mode: Mode) -> Option<i8> {
    let major = match letter {
        'C' => 0,
        'G' => 1,
        'D' => 2,
        'A' => 3,
        'E' => 4,
        'B' => 5,
        'F' => -1,
        _ => return None,
    };
    let sharps = major + FIFTH * accidental + mode.sharps_from_major();
    if (-7..=7).contains(&sharps) {
        Some(sharps as i8)
    } else {
        None
    }
}

/// Pitch class of the major tonic for a signature with `sharps` sharps:
/// each sharp moves the tonic up a fifth.
pub fn key_offset(sharps: i8) -> MidiPitch {
    let pc: ModNumC<i32, NOTES_PER_OCTAVE> = ModNumC::new(FIFTH * sharps as i32);
    pc.a()
}

/// Semitones that separate the subject's key from the template's.
pub fn transpose_offset(template_sharps: i8, subject_sharps: i8) -> MidiPitch {
    key_offset(template_sharps) - key_offset(subject_sharps)
}

/// Which letters a key signature raises or lowers, as a semitone
/// adjustment per letter in `C D E F G A B` order.
pub fn signature_accidentals(sharps: i8) -> [i32; 7] {
    const SHARP_ORDER: [usize; 7] = [3, 0, 4, 1, 5, 2, 6];
    const FLAT_ORDER: [usize; 7] = [6, 2, 5, 1, 4, 0, 3];
    let mut result = [0; 7];
    if sharps > 0 {
        for letter in SHARP_ORDER.iter().take(sharps as usize) {
            result[*letter] = 1;
        }
    } else {
        for letter in FLAT_ORDER.iter().take(sharps.unsigned_abs() as usize) {
            result[*letter] = -1;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_offset_table() {
        let table = [11, 6, 1, 8, 3, 10, 5, 0, 7, 2, 9, 4, 11, 6, 1];
        for (i, expected) in table.iter().enumerate() {
            assert_eq!(key_offset(i as i8 - 7), *expected);
        }
        assert!((-7..=7).all(|sharps| (0..12).contains(&key_offset(sharps))));
    }

    #[test]
    fn test_transpose_offset() {
        assert_eq!(transpose_offset(1, 0), 7);
        assert_eq!(transpose_offset(0, 1), -7);
        assert_eq!(transpose_offset(2, 2), 0);
        assert_eq!(transpose_offset(-1, 2), 3);
    }

    #[test]
    fn test_key_signature_sharps() {
        for (letter, accidental, mode, sharps) in [
            ('C', 0, Mode::Ionian, Some(0)),
            ('G', 0, Mode::Ionian, Some(1)),
            ('A', 0, Mode::Aeolian, Some(0)),
            ('E', 0, Mode::Aeolian, Some(1)),
            ('D', 0, Mode::Dorian, Some(0)),
            ('A', 0, Mode::Mixolydian, Some(2)),
            ('B', -1, Mode::Ionian, Some(-2)),
            ('F', 1, Mode::Aeolian, Some(3)),
            ('C', 1, Mode::Ionian, Some(7)),
            ('F', -1, Mode::Ionian, None),
            ('H', 0, Mode::Ionian, None),
        ] {
            assert_eq!(key_signature_sharps(letter, accidental, mode), sharps);
        }
    }

    #[test]
    fn test_mode_from_abc() {
        assert_eq!(Mode::from_abc(""), Some(Mode::Ionian));
        assert_eq!(Mode::from_abc("m"), Some(Mode::Aeolian));
        assert_eq!(Mode::from_abc("Min"), Some(Mode::Aeolian));
        assert_eq!(Mode::from_abc("mix"), Some(Mode::Mixolydian));
        assert_eq!(Mode::from_abc("Dorian"), Some(Mode::Dorian));
        assert_eq!(Mode::from_abc("lyd"), Some(Mode::Lydian));
        assert_eq!(Mode::from_abc("xy"), None);
    }

    #[test]
    fn test_signature_accidentals() {
        assert_eq!(signature_accidentals(0), [0; 7]);
        assert_eq!(signature_accidentals(2), [1, 0, 0, 1, 0, 0, 0]);
        assert_eq!(signature_accidentals(-3), [0, 0, -1, 0, 0, -1, -1]);
        assert_eq!(signature_accidentals(7), [1; 7]);
    }
}
