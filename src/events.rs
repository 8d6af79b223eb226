use enum_iterator::Sequence;
use num::rational::Ratio;
use std::fmt::{Display, Formatter};

pub type MidiPitch = i32;

/// Note lengths as the reader produces them, measured in quarter notes.
pub type Length = Ratio<i32>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Sequence)]
pub enum BarKind {
    Single,
    Double,
    RepeatOpen,
    RepeatClose,
    DoubleRepeat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TimeSignature {
    pub num: i32,
    pub denom: i32,
}

impl TimeSignature {
    pub fn new(num: i32, denom: i32) -> Self {
        TimeSignature { num, denom }
    }

    /// Length of one bar in quarter notes.
    pub fn bar_length(&self) -> Length {
        Length::new(4 * self.num, self.denom)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::new(4, 4)
    }
}

impl Display for TimeSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.denom)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
    Note { pitch: MidiPitch, duration: Length },
    TiedNote { pitch: MidiPitch, duration: Length },
    Rest { duration: Length },
    ChordStart,
    ChordEnd { duration: Length },
    GraceStart,
    GraceEnd,
    Bar(BarKind),
    TimeSignature(TimeSignature),
    Annotation(String),
    Decoration(String),
}

impl Event {
    pub fn duration(&self) -> Option<Length> {
        match self {
            Event::Note { duration, .. }
            | Event::TiedNote { duration, .. }
            | Event::Rest { duration }
            | Event::ChordEnd { duration } => Some(*duration),
            _ => None,
        }
    }

    pub fn scale_duration(&mut self, factor: Length) {
        match self {
            Event::Note { duration, .. }
            | Event::TiedNote { duration, .. }
            | Event::Rest { duration }
            | Event::ChordEnd { duration } => *duration *= factor,
            _ => {}
        }
    }
}

/// One tune as delivered by the reader: its reference number, key signature
/// as a count of sharps (negative for flats), and the flat event stream.
#[derive(Debug, Clone, Default)]
pub struct Tune {
    pub xref: i32,
    pub sharps: i8,
    pub events: Vec<Event>,
    pub warnings: Vec<String>,
}

impl Tune {
    pub fn feature_count(&self) -> usize {
        self.events.len()
    }
}
