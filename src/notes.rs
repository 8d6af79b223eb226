use crate::error::{MatchError, MatchResult};
use crate::events::{Event, Length, MidiPitch, TimeSignature};
use std::cmp::max;
use std::ops::Range;

/// Time units; a quarter note lasts 24 of them so that common subdivisions
/// (triplets, sixteenths, dotted values) come out as whole numbers.
pub type Units = i32;

pub const QUARTER_NOTE_UNITS: Units = 24;
const CONTOUR_OFFSET: MidiPitch = 256;
const TIE_CONTINUATIONS: usize = 2;

pub fn length_units(length: Length) -> Units {
    let fract = *length.numer() as f32 / *length.denom() as f32;
    // The 0.01 keeps exact fractions such as 1/3 from truncating one unit short.
    (fract * QUARTER_NOTE_UNITS as f32 + 0.01) as Units
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Element {
    Bar,
    Rest(Units),
    /// A note whose pitch carries no information, such as the first note of
    /// a contour. It is compatible with anything.
    Unknown(Units),
    Pitch(MidiPitch, Units),
}

impl Element {
    pub fn is_bar(&self) -> bool {
        *self == Element::Bar
    }

    pub fn duration(&self) -> Option<Units> {
        match self {
            Element::Bar => None,
            Element::Rest(d) | Element::Unknown(d) | Element::Pitch(_, d) => Some(*d),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Capacity {
    pub notes: usize,
    pub bars: usize,
}

impl Capacity {
    pub const SUBJECT: Capacity = Capacity { notes: 2000, bars: 600 };
    pub const TEMPLATE: Capacity = Capacity { notes: 1000, bars: 300 };
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BarIndex {
    offsets: Vec<usize>,
}

impl BarIndex {
    fn new() -> Self {
        BarIndex { offsets: vec![0] }
    }

    /// Number of bar lines seen; the segment after the last one is not counted.
    pub fn bar_count(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    fn range(&self, bar: usize, len: usize) -> Range<usize> {
        match self.offsets.get(bar) {
            None => len..len,
            Some(start) => *start..self.offsets.get(bar + 1).copied().unwrap_or(len),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NoteSequence {
    elements: Vec<Element>,
    bars: BarIndex,
    time_signature: TimeSignature,
}

impl NoteSequence {
    /// Folds a reader event stream into a flat element list. Chords collapse
    /// to their highest note, grace notes vanish, and a tied note swallows up
    /// to two rest continuations that follow it.
    pub fn build(events: &[Event], capacity: Capacity) -> MatchResult<Self> {
        let mut seq = NoteSequence {
            elements: vec![],
            bars: BarIndex::new(),
            time_signature: TimeSignature::default(),
        };
        let mut in_chord = false;
        let mut in_grace = false;
        let mut chord_pitch: MidiPitch = 0;
        let mut skip_rests = 0;

        for event in events.iter() {
            match event {
                Event::Note { pitch, duration } => {
                    if in_chord {
                        chord_pitch = max(chord_pitch, *pitch);
                    } else if !in_grace {
                        seq.elements.push(Element::Pitch(*pitch, length_units(*duration)));
                        skip_rests = 0;
                    }
                }
                Event::TiedNote { pitch, duration } => {
                    if in_chord {
                        chord_pitch = max(chord_pitch, *pitch);
                    } else if !in_grace {
                        seq.elements.push(Element::Pitch(*pitch, length_units(*duration)));
                        skip_rests = TIE_CONTINUATIONS;
                    }
                }
                Event::Rest { duration } => {
                    if skip_rests > 0 {
                        skip_rests -= 1;
                    } else {
                        seq.elements.push(Element::Rest(length_units(*duration)));
                    }
                }
                Event::ChordStart => {
                    in_chord = true;
                    chord_pitch = 0;
                }
                Event::ChordEnd { duration } => {
                    in_chord = false;
                    seq.elements.push(Element::Pitch(chord_pitch, length_units(*duration)));
                    skip_rests = 0;
                }
                Event::GraceStart => in_grace = true,
                Event::GraceEnd => in_grace = false,
                Event::Bar(_) => {
                    seq.elements.push(Element::Bar);
                    seq.bars.offsets.push(seq.elements.len());
                }
                Event::TimeSignature(ts) => seq.time_signature = *ts,
                Event::Annotation(_) | Event::Decoration(_) => {}
            }
            if seq.elements.len() > capacity.notes {
                return Err(MatchError::NoteCapacity { limit: capacity.notes });
            }
            if seq.bars.offsets.len() > capacity.bars {
                return Err(MatchError::BarCapacity { limit: capacity.bars });
            }
        }
        Ok(seq)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn bar_count(&self) -> usize {
        self.bars.bar_count()
    }

    pub fn bar_index(&self) -> &BarIndex {
        &self.bars
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// The elements of one bar, including its closing bar line when present.
    pub fn bar(&self, bar: usize) -> &[Element] {
        &self.elements[self.bars.range(bar, self.elements.len())]
    }

    /// Drops bar-index entries for empty leading bars (such as the segment in
    /// front of an opening `|`), so that bar 0 is the first bar with notes.
    /// Returns the number of entries removed.
    pub fn trim_leading_empty_bars(&mut self) -> usize {
        let mut trimmed = 0;
        while trimmed < self.bar_count()
            && self.elements.get(self.bars.offsets[trimmed]) == Some(&Element::Bar)
        {
            trimmed += 1;
        }
        self.bars.offsets.drain(0..trimmed);
        trimmed
    }

    /// Rewrites pitches as the interval from the previous pitch, so that a
    /// phrase matches itself in any key or octave.
    pub fn apply_contour(&mut self, quantize: bool) {
        let mut last_pitch = None;
        for element in self.elements.iter_mut() {
            if let Element::Pitch(pitch, duration) = *element {
                *element = match last_pitch {
                    None => Element::Unknown(duration),
                    Some(last) => {
                        let step = pitch - last;
                        let step = if quantize { quantize5(step) } else { step };
                        Element::Pitch(step + CONTOUR_OFFSET, duration)
                    }
                };
                last_pitch = Some(pitch);
            }
        }
    }
}

pub fn quantize5(step: MidiPitch) -> MidiPitch {
    if step < -4 {
        -2
    } else if step < -1 {
        -1
    } else if step > 4 {
        2
    } else if step > 1 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BarKind;

    fn q(num: i32, denom: i32) -> Length {
        Length::new(num, denom)
    }

    fn note(pitch: MidiPitch, num: i32, denom: i32) -> Event {
        Event::Note {pitch, duration: q(num, denom)}
    }

    fn bar() -> Event {
        Event::Bar(BarKind::Single)
    }

    #[test]
    fn test_length_units() {
        assert_eq!(length_units(q(1, 1)), 24);
        assert_eq!(length_units(q(1, 2)), 12);
        assert_eq!(length_units(q(1, 3)), 8);
        assert_eq!(length_units(q(2, 3)), 16);
        assert_eq!(length_units(q(3, 2)), 36);
        assert_eq!(length_units(q(1, 4)), 6);
        assert_eq!(length_units(q(12, 1)), 288);
        assert_eq!(length_units(q(1, 5)), 4);
        assert_eq!(length_units(q(2, 5)), 9);
    }

    #[test]
    fn test_build_bars() {
        let events = vec![bar(), note(60, 1, 1), note(62, 1, 1), bar(), note(64, 2, 1), bar()];
        let seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        assert_eq!(seq.bar_count(), 3);
        assert_eq!(seq.bar_index().offsets(), &[0, 1, 4, 6]);
        assert_eq!(seq.bar(0), &[Element::Bar]);
        assert_eq!(seq.bar(1), &[Element::Pitch(60, 24), Element::Pitch(62, 24), Element::Bar]);
        assert_eq!(seq.bar(2), &[Element::Pitch(64, 48), Element::Bar]);
        assert!(seq.bar(3).is_empty());
        assert!(seq.bar(10).is_empty());
    }

    #[test]
    fn test_chords_and_grace() {
        let events = vec![
            Event::GraceStart, note(70, 1, 8), Event::GraceEnd,
            Event::ChordStart, note(60, 1, 1), note(67, 1, 1), note(64, 1, 1), Event::ChordEnd {duration: q(2, 1)},
            note(62, 1, 2), bar(),
        ];
        let seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        assert_eq!(seq.elements(), &[Element::Pitch(67, 48), Element::Pitch(62, 12), Element::Bar]);
    }

    #[test]
    fn test_tie_absorbs_two_rests() {
        let events = vec![
            Event::TiedNote {pitch: 65, duration: q(1, 1)},
            Event::Rest {duration: q(1, 1)},
            Event::Rest {duration: q(1, 1)},
            Event::Rest {duration: q(1, 2)},
            bar(),
        ];
        let seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        assert_eq!(seq.elements(), &[Element::Pitch(65, 24), Element::Rest(12), Element::Bar]);
    }

    #[test]
    fn test_tie_disarmed_by_next_note() {
        let events = vec![
            Event::TiedNote {pitch: 65, duration: q(1, 1)},
            note(67, 1, 1),
            Event::Rest {duration: q(1, 1)},
        ];
        let seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        assert_eq!(seq.elements(), &[Element::Pitch(65, 24), Element::Pitch(67, 24), Element::Rest(24)]);
    }

    #[test]
    fn test_time_signature() {
        let events = vec![
            Event::TimeSignature(TimeSignature::new(3, 4)),
            note(60, 1, 1),
            Event::TimeSignature(TimeSignature::new(6, 8)),
            Event::Annotation("Am".to_string()),
        ];
        let seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        assert_eq!(seq.time_signature(), TimeSignature::new(6, 8));
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_note_capacity() {
        let events = vec![note(60, 1, 1); 4];
        let small = Capacity {notes: 3, bars: 10};
        assert!(matches!(NoteSequence::build(&events, small), Err(MatchError::NoteCapacity {limit: 3})));
        assert!(NoteSequence::build(&events[..3], small).is_ok());
    }

    #[test]
    fn test_bar_capacity() {
        let events = vec![bar(); 3];
        let small = Capacity {notes: 100, bars: 3};
        assert!(matches!(NoteSequence::build(&events, small), Err(MatchError::BarCapacity {limit: 3})));
        assert!(NoteSequence::build(&events[..2], small).is_ok());
    }

    #[test]
    fn test_trim_leading_empty_bars() {
        let events = vec![bar(), bar(), note(60, 1, 1), bar(), note(62, 1, 1), bar()];
        let mut seq = NoteSequence::build(&events, Capacity::TEMPLATE).unwrap();
        assert_eq!(seq.trim_leading_empty_bars(), 2);
        assert_eq!(seq.bar_count(), 2);
        assert_eq!(seq.bar(0), &[Element::Pitch(60, 24), Element::Bar]);
        assert_eq!(seq.bar(1), &[Element::Pitch(62, 24), Element::Bar]);
    }

    #[test]
    fn test_contour() {
        let events = vec![
            note(60, 1, 1), Event::Rest {duration: q(1, 1)}, bar(),
            note(67, 1, 1), note(62, 1, 1), note(62, 1, 1), bar(),
        ];
        let mut seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        seq.apply_contour(false);
        assert_eq!(seq.elements(), &[
            Element::Unknown(24), Element::Rest(24), Element::Bar,
            Element::Pitch(263, 24), Element::Pitch(251, 24), Element::Pitch(256, 24), Element::Bar,
        ]);
    }

    #[test]
    fn test_quantized_contour() {
        let events = vec![note(60, 1, 1), note(67, 1, 1), note(64, 1, 1), note(65, 1, 1), note(60, 1, 1)];
        let mut seq = NoteSequence::build(&events, Capacity::SUBJECT).unwrap();
        seq.apply_contour(true);
        assert_eq!(seq.elements(), &[
            Element::Unknown(24), Element::Pitch(258, 24), Element::Pitch(255, 24),
            Element::Pitch(256, 24), Element::Pitch(254, 24),
        ]);
    }

    #[test]
    fn test_quantize5() {
        for (step, bucket) in [(-7, -2), (-5, -2), (-4, -1), (-2, -1), (-1, 0), (0, 0), (1, 0), (2, 1), (4, 1), (5, 2), (12, 2)] {
            assert_eq!(quantize5(step), bucket);
        }
    }
}
