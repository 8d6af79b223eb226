use crate::abc::TuneReader;
use crate::config::MatchSettings;
use crate::error::{MatchError, MatchResult};
use crate::events::{MidiPitch, TimeSignature, Tune};
use crate::key::key_offset;
use crate::notes::{Capacity, Element, NoteSequence};
use crate::sampler::{make_bar_image, BarImage};
use log::debug;

/// The query bars, built once and reused against every corpus tune.
#[derive(Debug, Clone)]
pub struct Template {
    sequence: NoteSequence,
    xref: i32,
    sharps: i8,
    images: Vec<Option<BarImage>>,
}

impl Template {
    pub fn prepare(tune: &Tune, settings: &MatchSettings) -> MatchResult<Self> {
        let mut sequence = NoteSequence::build(&tune.events, Capacity::TEMPLATE)?;
        let trimmed = sequence.trim_leading_empty_bars();
        if settings.contour.is_on() {
            sequence.apply_contour(settings.contour.quantized());
        }
        let images = if settings.resolution > 0 {
            (0..sequence.bar_count())
                .map(|bar| make_bar_image(sequence.bar(bar), settings.resolution, 0, bar))
                .collect()
        } else {
            vec![]
        };
        debug!(
            "template X:{} {} bars ({trimmed} leading bar lines dropped) {} time-signature {} sharps",
            tune.xref,
            sequence.bar_count(),
            sequence.time_signature(),
            tune.sharps
        );
        Ok(Template { sequence, xref: tune.xref, sharps: tune.sharps, images })
    }

    /// Prepares the first tune of an ABC text; `source` names the text in errors.
    pub fn from_abc(text: &str, source: &str, settings: &MatchSettings) -> MatchResult<Self> {
        let tune = TuneReader::new(text)
            .next()
            .ok_or_else(|| MatchError::EmptyTemplate(source.to_string()))?;
        Template::prepare(&tune, settings)
    }

    pub fn bar_count(&self) -> usize {
        self.sequence.bar_count()
    }

    pub fn bar(&self, bar: usize) -> &[Element] {
        self.sequence.bar(bar)
    }

    /// Sampled form of a template bar, or `None` if it was unsamplable or
    /// the template was prepared for exact matching.
    pub fn image(&self, bar: usize) -> Option<&BarImage> {
        self.images.get(bar).and_then(|img| img.as_ref())
    }

    pub fn xref(&self) -> i32 {
        self.xref
    }

    pub fn key_offset(&self) -> MidiPitch {
        key_offset(self.sharps)
    }

    pub fn sharps(&self) -> i8 {
        self.sharps
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.sequence.time_signature()
    }

    pub fn sequence(&self) -> &NoteSequence {
        &self.sequence
    }
}
