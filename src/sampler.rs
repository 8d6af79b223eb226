use crate::events::MidiPitch;
use crate::notes::{Element, Units};
use log::warn;

const MAX_NOTES_PER_BAR: usize = 50;
const MAX_SAMPLES_PER_BAR: usize = 400;
/// Twelve quarter notes; bars holding anything longer are not sampled.
pub const MAX_SAMPLED_NOTE: Units = 288;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Sample {
    Rest,
    Unknown,
    Pitch(MidiPitch),
}

impl Sample {
    pub fn is_unknown(&self) -> bool {
        *self == Sample::Unknown
    }
}

/// The pitch sounding at each tick of a fixed grid across one bar. Two bars
/// with different rhythmic spelling but the same sound produce the same image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BarImage {
    samples: Vec<Sample>,
}

impl BarImage {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of times the sampled value differs from the one before, skipping
    /// unknown samples on either side of the comparison.
    pub fn count_changes(&self, other: &BarImage) -> usize {
        let mut changes = 0;
        let mut last = self.samples.first().copied();
        for (mine, theirs) in self.samples.iter().zip(other.samples.iter()) {
            if *mine == Sample::Unknown || *theirs == Sample::Unknown {
                continue;
            }
            if last != Some(*mine) {
                last = Some(*mine);
                changes += 1;
            }
        }
        changes
    }
}

/// Resamples `bar` at one sample per `resolution` time units, shifting
/// pitches by `delta`. Returns `None` when the bar cannot be sampled: the
/// resolution is not positive, the bar is empty, or it holds a note longer
/// than [`MAX_SAMPLED_NOTE`]. `bar_number` only labels diagnostics.
pub fn make_bar_image(bar: &[Element], resolution: Units, delta: MidiPitch, bar_number: usize) -> Option<BarImage> {
    if resolution <= 0 {
        return None;
    }
    let mut notes = vec![];
    let mut ends = vec![];
    let mut total = 0;
    for element in bar.iter().take_while(|e| !e.is_bar()) {
        if notes.len() == MAX_NOTES_PER_BAR {
            warn!("make_bar_image -- bar {bar_number} has too many notes");
            break;
        }
        let duration = element.duration()?;
        if duration > MAX_SAMPLED_NOTE {
            return None;
        }
        total += duration;
        notes.push(*element);
        ends.push(total);
    }
    if total <= 0 {
        return None;
    }

    let mut samples = vec![];
    let mut i = 0;
    let mut t = 0;
    while t < total {
        while t >= ends[i] {
            i += 1;
        }
        if samples.len() == MAX_SAMPLES_PER_BAR {
            warn!("make_bar_image -- pitch_sample is out of space for bar {bar_number}");
            break;
        }
        samples.push(match notes[i] {
            Element::Rest(_) => Sample::Rest,
            Element::Pitch(pitch, _) => Sample::Pitch(pitch + delta),
            _ => Sample::Unknown,
        });
        t += resolution;
    }
    Some(BarImage { samples })
}
