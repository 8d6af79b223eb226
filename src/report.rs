use crate::histogram::NoteHistograms;
use std::io::{self, Write};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BarMatches {
    /// Reported subject bars, each matching some template bar.
    AnyBar(Vec<usize>),
    /// Aligned runs of subject bars matching the template in order.
    Runs(Vec<Vec<usize>>),
}

impl BarMatches {
    pub fn is_empty(&self) -> bool {
        match self {
            BarMatches::AnyBar(bars) => bars.is_empty(),
            BarMatches::Runs(runs) => runs.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TuneMatches {
    pub file_index: usize,
    pub xref: i32,
    pub found: BarMatches,
}

impl TuneMatches {
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match &self.found {
            BarMatches::AnyBar(bars) => {
                if let Some((first, rest)) = bars.split_first() {
                    write!(out, "{} {}  {} ", self.file_index, self.xref, first)?;
                    for bar in rest {
                        write!(out, " {bar} ")?;
                    }
                    writeln!(out)?;
                }
            }
            BarMatches::Runs(runs) => {
                for run in runs {
                    write!(out, "{} {} ", self.file_index, self.xref)?;
                    for bar in run {
                        write!(out, "{bar} ")?;
                    }
                    writeln!(out)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BriefEntry {
    pub file_index: usize,
    pub count: usize,
}

/// Brief-mode output: the template's bar count heads the list, but only once
/// some tune qualifies.
#[derive(Debug, Clone)]
pub struct BriefReport {
    template_bars: usize,
    entries: usize,
}

impl BriefReport {
    pub fn new(template_bars: usize) -> Self {
        BriefReport { template_bars, entries: 0 }
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn write_entry<W: Write>(&mut self, entry: &BriefEntry, out: &mut W) -> io::Result<()> {
        if self.entries == 0 {
            writeln!(out, "{}", self.template_bars)?;
        }
        self.entries += 1;
        writeln!(out, " {} {}", entry.file_index, entry.count)
    }
}

pub fn write_pitch_histogram<W: Write>(hist: &NoteHistograms, out: &mut W) -> io::Result<()> {
    write!(out, "\n\npitch_histogram\n")?;
    for (pitch, n) in hist.pitch_bins() {
        writeln!(out, "{pitch} {n}")?;
    }
    Ok(())
}

pub fn write_length_histogram<W: Write>(hist: &NoteHistograms, out: &mut W) -> io::Result<()> {
    write!(out, "\n\nlength histogram\n")?;
    for (length, n) in hist.length_bins() {
        writeln!(out, "{length} {n}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, Length};
    use crate::notes::{Capacity, NoteSequence};

    fn render(matches: &TuneMatches) -> String {
        let mut out = vec![];
        matches.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_any_bar_line() {
        let matches = TuneMatches {file_index: 3, xref: 12, found: BarMatches::AnyBar(vec![0, 4, 7])};
        assert_eq!(render(&matches), "3 12  0  4  7 \n");
        let single = TuneMatches {file_index: 0, xref: 1, found: BarMatches::AnyBar(vec![2])};
        assert_eq!(render(&single), "0 1  2 \n");
        let none = TuneMatches {file_index: 0, xref: 1, found: BarMatches::AnyBar(vec![])};
        assert_eq!(render(&none), "");
    }

    #[test]
    fn test_run_lines() {
        let matches = TuneMatches {file_index: 5, xref: 9, found: BarMatches::Runs(vec![vec![0, 1], vec![6, 7]])};
        assert_eq!(render(&matches), "5 9 0 1 \n5 9 6 7 \n");
    }

    #[test]
    fn test_brief_header_once() {
        let mut report = BriefReport::new(8);
        let mut out = vec![];
        report.write_entry(&BriefEntry {file_index: 2, count: 5}, &mut out).unwrap();
        report.write_entry(&BriefEntry {file_index: 7, count: 3}, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "8\n 2 5\n 7 3\n");
        assert_eq!(report.entries(), 2);
    }

    #[test]
    fn test_histogram_output() {
        let events: Vec<Event> = [60, 62, 60].iter().map(|p| Event::Note {pitch: *p, duration: Length::new(1, 2)}).collect();
        let mut hist = NoteHistograms::new();
        hist.add(&NoteSequence::build(&events, Capacity::SUBJECT).unwrap());
        let mut out = vec![];
        write_pitch_histogram(&hist, &mut out).unwrap();
        write_length_histogram(&hist, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\n\npitch_histogram\n60 2\n62 1\n\n\nlength histogram\n12 3\n");
    }
}
