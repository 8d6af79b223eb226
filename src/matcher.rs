use crate::config::MatchSettings;
use crate::events::MidiPitch;
use crate::notes::{Element, NoteSequence};
use crate::sampler::{make_bar_image, BarImage};
use crate::template::Template;

/// Longest run of template bars tried in sequence mode.
pub const MAX_RUN_BARS: usize = 16;
const SIMPLE_BAR_NOTES: usize = 2;
const SIMPLE_BAR_CHANGES: usize = 3;

/// Compares two bars note by note. The subject must equal the template
/// moved up by `shift` semitones, with identical durations; rests pair with
/// rests and unknown notes pair with anything.
pub fn match_exact(template: &[Element], subject: &[Element], shift: MidiPitch, ignore_simple: bool) -> bool {
    if template.first().map_or(true, |e| e.is_bar()) {
        return false;
    }
    let mut compared = 0;
    let mut len = 0;
    for (i, t) in template.iter().take_while(|e| !e.is_bar()).enumerate() {
        len = i + 1;
        let s = match subject.get(i) {
            None | Some(Element::Bar) => return false,
            Some(s) => s,
        };
        match (t, s) {
            (Element::Rest(_), Element::Rest(_)) => {}
            (Element::Unknown(_), _) | (_, Element::Unknown(_)) => {}
            (Element::Pitch(tp, td), Element::Pitch(sp, sd)) if *sp == tp + shift && sd == td => compared += 1,
            _ => return false,
        }
    }
    if subject.get(len).map_or(false, |s| !s.is_bar()) {
        return false;
    }
    compared > SIMPLE_BAR_NOTES || !ignore_simple
}

/// Compares two sampled bars position by position. With `ignore_simple`,
/// bars whose subject samples change fewer than three times are rejected.
pub fn match_images(template: &BarImage, subject: &BarImage, ignore_simple: bool) -> bool {
    if template.len() != subject.len() {
        return false;
    }
    let mismatch = template
        .samples()
        .iter()
        .zip(subject.samples().iter())
        .any(|(t, s)| !t.is_unknown() && !s.is_unknown() && t != s);
    if mismatch {
        return false;
    }
    !ignore_simple || subject.count_changes(template) >= SIMPLE_BAR_CHANGES
}

/// Bar matching between the template and one subject tune. `transpose` is
/// the template's key offset minus the subject's; adding it to a subject
/// pitch moves that pitch into the template's key.
pub struct Matcher<'a> {
    template: &'a Template,
    settings: &'a MatchSettings,
    transpose: MidiPitch,
}

impl<'a> Matcher<'a> {
    pub fn new(template: &'a Template, settings: &'a MatchSettings, transpose: MidiPitch) -> Self {
        Matcher { template, settings, transpose }
    }

    fn subject_image(&self, subject: &NoteSequence, bar: usize) -> Option<BarImage> {
        make_bar_image(subject.bar(bar), self.settings.resolution, self.transpose, bar)
    }

    fn notes_match(&self, template_bar: usize, subject: &NoteSequence, subject_bar: usize) -> bool {
        match_exact(
            self.template.bar(template_bar),
            subject.bar(subject_bar),
            -self.transpose,
            self.settings.ignore_simple,
        )
    }

    fn image_matches(&self, template_bar: usize, subject_image: &BarImage) -> bool {
        self.template
            .image(template_bar)
            .map_or(false, |img| match_images(img, subject_image, self.settings.ignore_simple))
    }

    fn sampled(&self) -> bool {
        self.settings.resolution > 0
    }

    /// Index of the first template bar matching `subject_bar`.
    pub fn first_matching_template_bar(&self, subject: &NoteSequence, subject_bar: usize) -> Option<usize> {
        if self.sampled() {
            let subject_image = self.subject_image(subject, subject_bar)?;
            (0..self.template.bar_count()).find(|t| self.image_matches(*t, &subject_image))
        } else {
            (0..self.template.bar_count()).find(|t| self.notes_match(*t, subject, subject_bar))
        }
    }

    fn bars_match(&self, template_bar: usize, subject: &NoteSequence, subject_bar: usize) -> bool {
        if self.sampled() {
            self.subject_image(subject, subject_bar)
                .map_or(false, |img| self.image_matches(template_bar, &img))
        } else {
            self.notes_match(template_bar, subject, subject_bar)
        }
    }

    /// Subject bars matching any template bar, numbered as reported (the
    /// segment before the first bar line is bar 0 internally and never reported).
    pub fn any_bar_matches(&self, subject: &NoteSequence) -> Vec<usize> {
        (1..subject.bar_count())
            .filter(|bar| self.first_matching_template_bar(subject, *bar).is_some())
            .map(|bar| bar - 1)
            .collect()
    }

    /// Runs of consecutive subject bars that match the template bars in order.
    pub fn sequence_matches(&self, subject: &NoteSequence) -> Vec<Vec<usize>> {
        let template_bars = self.template.bar_count();
        if template_bars == 0 || subject.bar_count() < template_bars {
            return vec![];
        }
        let run_len = template_bars.min(MAX_RUN_BARS);
        (1..=subject.bar_count() - template_bars)
            .filter(|start| (0..run_len).all(|j| self.bars_match(j, subject, start + j)))
            .map(|start| (start - 1..start - 1 + run_len).collect())
            .collect()
    }

    /// Number of subject bars that find a matching template bar, compared
    /// note by note.
    pub fn count_matched_subject_bars(&self, subject: &NoteSequence) -> usize {
        (0..subject.bar_count())
            .filter(|bar| (0..self.template.bar_count()).any(|t| self.notes_match(t, subject, *bar)))
            .count()
    }
}
