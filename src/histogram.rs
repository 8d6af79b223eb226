use crate::events::MidiPitch;
use crate::notes::{Element, NoteSequence, Units};
use histogram_macros::*;
use std::collections::BTreeMap;

pub const MAX_HISTOGRAM_PITCH: MidiPitch = 127;
/// Lengths at or above this many units share the top bin.
pub const MAX_HISTOGRAM_LENGTH: Units = 143;

/// Pitch and length frequencies accumulated over a whole corpus. Rests land
/// in pitch bin 0; bar lines are not counted.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct NoteHistograms {
    pitches: BTreeMap<MidiPitch, usize>,
    lengths: BTreeMap<Units, usize>,
}

impl NoteHistograms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sequence: &NoteSequence) {
        let NoteHistograms { pitches, lengths } = self;
        for element in sequence.elements() {
            let (pitch, duration) = match element {
                Element::Bar | Element::Unknown(_) => continue,
                Element::Rest(d) => (0, *d),
                Element::Pitch(p, d) => (*p, *d),
            };
            if (0..=MAX_HISTOGRAM_PITCH).contains(&pitch) {
                bump_by!(pitches, pitch, 1);
            }
            bump_by!(lengths, duration.clamp(0, MAX_HISTOGRAM_LENGTH), 1);
        }
    }

    pub fn pitch_count(&self, pitch: MidiPitch) -> usize {
        self.pitches.get(&pitch).copied().unwrap_or(0)
    }

    pub fn length_count(&self, length: Units) -> usize {
        self.lengths.get(&length).copied().unwrap_or(0)
    }

    /// Nonzero pitch bins in ascending order.
    pub fn pitch_bins(&self) -> impl Iterator<Item = (MidiPitch, usize)> + '_ {
        self.pitches.iter().map(|(k, v)| (*k, *v))
    }

    pub fn length_bins(&self) -> impl Iterator<Item = (Units, usize)> + '_ {
        self.lengths.iter().map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BarKind, Event, Length};
    use crate::notes::Capacity;

    fn sequence(events: Vec<Event>) -> NoteSequence {
        NoteSequence::build(&events, Capacity::SUBJECT).unwrap()
    }

    #[test]
    fn test_three_notes() {
        let quarter = Length::new(1, 1);
        let seq = sequence(vec![
            Event::Bar(BarKind::Single),
            Event::Note {pitch: 60, duration: quarter},
            Event::Note {pitch: 62, duration: quarter},
            Event::Note {pitch: 64, duration: quarter},
            Event::Bar(BarKind::Single),
        ]);
        let mut hist = NoteHistograms::new();
        hist.add(&seq);
        for pitch in 0..=MAX_HISTOGRAM_PITCH {
            let expected = if [60, 62, 64].contains(&pitch) {1} else {0};
            assert_eq!(hist.pitch_count(pitch), expected);
        }
        assert_eq!(hist.length_bins().collect::<Vec<_>>(), vec![(24, 3)]);
    }

    #[test]
    fn test_rests_and_clamping() {
        let seq = sequence(vec![
            Event::Rest {duration: Length::new(1, 2)},
            Event::Note {pitch: 67, duration: Length::new(8, 1)},
            Event::Note {pitch: 67, duration: Length::new(6, 1)},
        ]);
        let mut hist = NoteHistograms::new();
        hist.add(&seq);
        hist.add(&seq);
        assert_eq!(hist.pitch_bins().collect::<Vec<_>>(), vec![(0, 2), (67, 4)]);
        assert_eq!(hist.length_count(12), 2);
        assert_eq!(hist.length_count(MAX_HISTOGRAM_LENGTH), 4);
    }
}
