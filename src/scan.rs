use crate::abc::TuneReader;
use crate::config::{RunMode, ScanConfig, SearchMode};
use crate::error::{MatchError, MatchResult};
use crate::events::Tune;
use crate::histogram::NoteHistograms;
use crate::key::transpose_offset;
use crate::matcher::Matcher;
use crate::notes::{Capacity, NoteSequence};
use crate::report::{write_length_histogram, write_pitch_histogram, BarMatches, BriefEntry, BriefReport, TuneMatches};
use crate::template::Template;
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::Path;

/// The query bars are always read from this file in the working directory.
pub const TEMPLATE_FILENAME: &str = "match.abc";
/// A tune with fewer parsed features than this ends the scan.
pub const MIN_TUNE_FEATURES: usize = 10;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TuneOutcome {
    EndOfCorpus,
    Skipped,
    Counted,
    NoMatch,
    Matches(TuneMatches),
    Brief(BriefEntry),
}

pub fn read_abc_file(path: &Path) -> MatchResult<String> {
    let bytes = fs::read(path).map_err(|source| MatchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub struct Scanner {
    config: ScanConfig,
    template: Option<Template>,
    histograms: NoteHistograms,
}

impl Scanner {
    pub fn new(config: ScanConfig, template: Option<Template>) -> Self {
        Scanner { config, template, histograms: NoteHistograms::new() }
    }

    pub fn histograms(&self) -> &NoteHistograms {
        &self.histograms
    }

    /// Classifies one corpus tune. `file_index` counts tunes from 0 in file order.
    pub fn scan_tune(&mut self, file_index: usize, tune: &Tune) -> MatchResult<TuneOutcome> {
        if tune.feature_count() < MIN_TUNE_FEATURES {
            debug!("X:{} has {} features; stopping", tune.xref, tune.feature_count());
            return Ok(TuneOutcome::EndOfCorpus);
        }
        let mut subject = NoteSequence::build(&tune.events, Capacity::SUBJECT)?;
        debug!("X:{} {} elements {} bars", tune.xref, subject.len(), subject.bar_count());

        if let RunMode::Histograms { .. } = self.config.run_mode {
            self.histograms.add(&subject);
            return Ok(TuneOutcome::Counted);
        }

        let template = self
            .template
            .as_ref()
            .ok_or_else(|| MatchError::EmptyTemplate(TEMPLATE_FILENAME.to_string()))?;
        if subject.time_signature() != template.time_signature() {
            debug!("X:{} time signature {} differs; skipped", tune.xref, subject.time_signature());
            return Ok(TuneOutcome::Skipped);
        }

        let settings = &self.config.settings;
        let transpose = if settings.contour.is_on() {
            subject.apply_contour(settings.contour.quantized());
            0
        } else {
            transpose_offset(template.sharps(), tune.sharps)
        };
        let matcher = Matcher::new(template, settings, transpose);

        let found = match self.config.run_mode {
            RunMode::Bars(SearchMode::AnyBar) => BarMatches::AnyBar(matcher.any_bar_matches(&subject)),
            RunMode::Bars(SearchMode::Sequence) => BarMatches::Runs(matcher.sequence_matches(&subject)),
            RunMode::Brief { threshold } => {
                if file_index as i64 == template.xref() as i64 {
                    return Ok(TuneOutcome::Skipped);
                }
                let count = matcher.count_matched_subject_bars(&subject);
                debug!("X:{} shares {count} bars with the template", tune.xref);
                return Ok(if count >= threshold {
                    TuneOutcome::Brief(BriefEntry { file_index, count })
                } else {
                    TuneOutcome::NoMatch
                });
            }
            RunMode::Histograms { .. } => return Ok(TuneOutcome::Counted),
        };
        if found.is_empty() {
            Ok(TuneOutcome::NoMatch)
        } else {
            Ok(TuneOutcome::Matches(TuneMatches { file_index, xref: tune.xref, found }))
        }
    }

    /// Scans every tune of `corpus`, writing results as each tune finishes
    /// and the histograms at the end. Returns the number of tunes scanned.
    pub fn scan<W: Write>(&mut self, corpus: &str, out: &mut W) -> MatchResult<usize> {
        let mut brief = BriefReport::new(self.template.as_ref().map_or(0, |t| t.bar_count()));
        let mut scanned = 0;
        for (file_index, tune) in TuneReader::new(corpus).enumerate() {
            if self.config.check {
                for warning in tune.warnings.iter() {
                    warn!("X:{} {warning}", tune.xref);
                }
            }
            match self.scan_tune(file_index, &tune)? {
                TuneOutcome::EndOfCorpus => break,
                TuneOutcome::Matches(matches) => matches.write_to(out)?,
                TuneOutcome::Brief(entry) => brief.write_entry(&entry, out)?,
                TuneOutcome::Skipped | TuneOutcome::Counted | TuneOutcome::NoMatch => {}
            }
            scanned += 1;
        }
        if let RunMode::Histograms { pitch, length } = self.config.run_mode {
            if pitch {
                write_pitch_histogram(&self.histograms, out)?;
            }
            if length {
                write_length_histogram(&self.histograms, out)?;
            }
        }
        debug!("scanned {scanned} tunes");
        Ok(scanned)
    }
}
