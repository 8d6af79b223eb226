use crate::events::{BarKind, Event, Length, MidiPitch, TimeSignature, Tune};
use crate::key::{key_signature_sharps, signature_accidentals, Mode, NOTES_PER_OCTAVE};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Lines;

const MIDDLE_C: MidiPitch = 60;
const LETTERS: &str = "CDEFGAB";
const LETTER_SEMITONES: [MidiPitch; 7] = [0, 2, 4, 5, 7, 9, 11];
const DECORATION_CHARS: &str = ".~HLMOPSTuv";
const IGNORED_CHARS: &str = " \t`\\y()";
/// Largest written length multiplier or divisor.
const MAX_LENGTH_FACTOR: i32 = 256;
const MAX_REST_BARS: i32 = 256;

/// Splits an ABC text into tunes. A tune starts at an `X:` line and runs to
/// the next blank line or `X:` line; anything before the first `X:` is
/// skipped.
pub struct TuneReader<'a> {
    lines: Peekable<Lines<'a>>,
}

impl<'a> TuneReader<'a> {
    pub fn new(text: &'a str) -> Self {
        TuneReader { lines: text.lines().peekable() }
    }
}

impl Iterator for TuneReader<'_> {
    type Item = Tune;

    fn next(&mut self) -> Option<Tune> {
        while let Some(&line) = self.lines.peek() {
            if is_xref_line(line) {
                break;
            }
            self.lines.next();
        }
        let first = self.lines.next()?;
        let mut parser = TuneParser::default();
        parser.read_line(first);
        while let Some(&line) = self.lines.peek() {
            if line.trim().is_empty() || is_xref_line(line) {
                break;
            }
            parser.read_line(line);
            self.lines.next();
        }
        Some(parser.finish())
    }
}

fn is_xref_line(line: &str) -> bool {
    line.trim_start().starts_with("X:")
}

/// `Some(None)` means the meter is explicitly free (`M:none`).
pub fn parse_meter(value: &str) -> Option<Option<TimeSignature>> {
    match value.trim() {
        "" | "none" => Some(None),
        "C" => Some(Some(TimeSignature::new(4, 4))),
        "C|" => Some(Some(TimeSignature::new(2, 2))),
        other => {
            let (num, denom) = parse_fraction(other)?;
            Some(Some(TimeSignature::new(num, denom)))
        }
    }
}

fn parse_fraction(value: &str) -> Option<(i32, i32)> {
    let (num, denom) = value.trim().split_once('/')?;
    let num = num.trim().parse::<i32>().ok()?;
    let denom = denom.trim().parse::<i32>().ok()?;
    if num > 0 && denom > 0 {
        Some((num, denom))
    } else {
        None
    }
}

/// Sharps (negative for flats) named by a `K:` field.
pub fn parse_key(value: &str) -> Option<i8> {
    let value = value.trim();
    match value.split_whitespace().next() {
        None | Some("none") | Some("HP") => return Some(0),
        Some("Hp") => return Some(2),
        _ => {}
    }
    let mut chars = value.chars();
    let letter = chars.next()?;
    let rest = chars.as_str();
    let (accidental, rest) = if let Some(r) = rest.strip_prefix('#') {
        (1, r)
    } else if let Some(r) = rest.strip_prefix('b') {
        (-1, r)
    } else {
        (0, rest)
    };
    let mode_name = rest
        .split_whitespace()
        .next()
        .filter(|token| !token.contains('='))
        .unwrap_or("");
    key_signature_sharps(letter, accidental, Mode::from_abc(mode_name)?)
}

fn default_unit(meter: Option<TimeSignature>) -> Length {
    match meter {
        Some(ts) if Length::new(ts.num, ts.denom) < Length::new(3, 4) => Length::new(1, 4),
        _ => Length::new(1, 2),
    }
}

fn read_number(chars: &[char], i: &mut usize) -> Option<i32> {
    let start = *i;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    if start == *i {
        None
    } else {
        chars[start..*i].iter().collect::<String>().parse().ok()
    }
}

fn next_is(chars: &[char], i: usize, c: char) -> bool {
    chars.get(i) == Some(&c)
}

#[derive(Default)]
struct TuneParser {
    tune: Tune,
    seen_xref: bool,
    in_body: bool,
    meter: Option<TimeSignature>,
    /// Length of `L:` in quarter notes.
    unit: Option<Length>,
    signature: [i32; 7],
    bar_accidentals: HashMap<(usize, i32), i32>,
    in_chord: bool,
    /// Index of the open chord's `ChordStart`.
    chord_start: Option<usize>,
    chord_length: Option<Length>,
    in_grace: bool,
    tie_pending: bool,
    broken_next: Option<Length>,
    tuplet: Option<(Length, i32)>,
    last_note: Option<usize>,
}

impl TuneParser {
    fn warn(&mut self, message: String) {
        self.tune.warnings.push(message);
    }

    fn unit(&mut self) -> Length {
        let meter = self.meter;
        *self.unit.get_or_insert_with(|| default_unit(meter))
    }

    fn read_line(&mut self, line: &str) {
        let line = line.split('%').next().unwrap_or("");
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let mut chars = trimmed.chars();
        if let (Some(field), Some(':')) = (chars.next(), chars.next()) {
            if field.is_ascii_alphabetic() {
                self.read_field(field, chars.as_str());
                return;
            }
        }
        if self.in_body {
            self.read_music(line);
        }
    }

    fn read_field(&mut self, field: char, value: &str) {
        match field {
            'X' if !self.seen_xref => {
                self.seen_xref = true;
                match value.trim().parse() {
                    Ok(xref) => self.tune.xref = xref,
                    Err(_) => self.warn(format!("bad reference number X:{value}")),
                }
            }
            'M' => match parse_meter(value) {
                Some(Some(ts)) => {
                    self.meter = Some(ts);
                    self.tune.events.push(Event::TimeSignature(ts));
                }
                Some(None) => {}
                None => self.warn(format!("cannot read meter M:{value}")),
            },
            'L' => match parse_fraction(value) {
                Some((num, denom)) => self.unit = Some(Length::new(4 * num, denom)),
                None => self.warn(format!("cannot read unit length L:{value}")),
            },
            'K' => {
                let sharps = parse_key(value).unwrap_or_else(|| {
                    self.tune.warnings.push(format!("cannot read key K:{value}"));
                    0
                });
                self.signature = signature_accidentals(sharps);
                if !self.in_body {
                    self.tune.sharps = sharps;
                    self.in_body = true;
                    self.unit();
                }
            }
            _ => {}
        }
    }

    fn read_music(&mut self, line: &str) {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            i += 1;
            match c {
                'A'..='G' | 'a'..='g' | '^' | '_' | '=' => {
                    i -= 1;
                    self.read_note(&chars, &mut i);
                }
                'z' | 'x' => {
                    let duration = self.unit() * self.read_multiplier(&chars, &mut i);
                    // A chord takes its length from its notes.
                    if !self.in_chord {
                        self.tie_pending = false;
                        self.push_timed(Event::Rest { duration });
                    }
                }
                'Z' => {
                    let mut bars = read_number(&chars, &mut i).unwrap_or(1);
                    if bars > MAX_REST_BARS {
                        self.warn(format!("multi-bar rest Z{bars} too long"));
                        bars = MAX_REST_BARS;
                    }
                    let bar_length = self.meter.unwrap_or_default().bar_length();
                    self.push_timed(Event::Rest { duration: bar_length * Length::from_integer(bars) });
                }
                '|' => {
                    let kind = if next_is(&chars, i, ':') {
                        i += 1;
                        BarKind::RepeatOpen
                    } else if next_is(&chars, i, '|') || next_is(&chars, i, ']') {
                        i += 1;
                        BarKind::Double
                    } else {
                        BarKind::Single
                    };
                    self.push_bar(kind);
                    skip_variant(&chars, &mut i);
                }
                ':' => self.read_colon_bar(&chars, &mut i),
                '[' => self.read_open_bracket(&chars, &mut i),
                ']' => self.end_chord(&chars, &mut i),
                '{' => {
                    self.in_grace = true;
                    self.tune.events.push(Event::GraceStart);
                }
                '}' => {
                    self.in_grace = false;
                    self.tune.events.push(Event::GraceEnd);
                }
                '"' => {
                    let text = read_until(&chars, &mut i, '"');
                    self.tune.events.push(Event::Annotation(text));
                }
                '!' | '+' => {
                    if chars[i..].contains(&c) {
                        let text = read_until(&chars, &mut i, c);
                        self.tune.events.push(Event::Decoration(text));
                    }
                }
                '-' => self.tie(),
                '>' | '<' => self.broken_rhythm(c, &chars, &mut i),
                '(' if chars.get(i).map_or(false, |d| d.is_ascii_digit()) => self.read_tuplet(&chars, &mut i),
                '/' if self.in_grace => {}
                c if DECORATION_CHARS.contains(c) => self.tune.events.push(Event::Decoration(c.to_string())),
                c if IGNORED_CHARS.contains(c) => {}
                c => self.warn(format!("unrecognised character '{c}'")),
            }
        }
        self.close_grace("grace notes not closed on their line");
    }

    fn read_multiplier(&mut self, chars: &[char], i: &mut usize) -> Length {
        let mut num = read_number(chars, i).unwrap_or(1);
        let mut denom: i32 = 1;
        while next_is(chars, *i, '/') {
            *i += 1;
            match read_number(chars, i) {
                None => denom = denom.saturating_mul(2),
                Some(d) if d > 0 => denom = denom.saturating_mul(d),
                Some(_) => self.warn("zero length divisor".to_string()),
            }
        }
        if num > MAX_LENGTH_FACTOR || denom > MAX_LENGTH_FACTOR {
            self.warn(format!("note length {num}/{denom} out of range"));
            num = num.min(MAX_LENGTH_FACTOR);
            denom = denom.min(MAX_LENGTH_FACTOR);
        }
        Length::new(num, denom)
    }

    fn read_note(&mut self, chars: &[char], i: &mut usize) {
        let mut accidental = None;
        while let Some(c) = chars.get(*i).filter(|c| matches!(c, '^' | '_' | '=')) {
            accidental = Some(match c {
                '^' => accidental.unwrap_or(0) + 1,
                '_' => accidental.unwrap_or(0) - 1,
                _ => 0,
            });
            *i += 1;
        }
        let Some(letter) = chars.get(*i).copied() else {
            self.warn("accidental without a note".to_string());
            return;
        };
        let Some(index) = LETTERS.find(letter.to_ascii_uppercase()).filter(|_| letter.is_ascii_alphabetic()) else {
            self.warn(format!("accidental before '{letter}'"));
            return;
        };
        *i += 1;
        let mut octave = if letter.is_ascii_lowercase() { 1 } else { 0 };
        while let Some(mark) = chars.get(*i) {
            match mark {
                '\'' => octave += 1,
                ',' => octave -= 1,
                _ => break,
            }
            *i += 1;
        }
        let semitones = match accidental {
            Some(a) => {
                self.bar_accidentals.insert((index, octave), a);
                a
            }
            None => self.bar_accidentals.get(&(index, octave)).copied().unwrap_or(self.signature[index]),
        };
        let pitch = MIDDLE_C + NOTES_PER_OCTAVE as MidiPitch * octave + LETTER_SEMITONES[index] + semitones;
        let duration = self.unit() * self.read_multiplier(chars, i);

        if self.in_grace {
            self.tune.events.push(Event::Note { pitch, duration });
        } else if self.in_chord {
            self.chord_length.get_or_insert(duration);
            self.tune.events.push(Event::Note { pitch, duration });
        } else if self.tie_pending {
            self.tie_pending = false;
            self.push_timed(Event::Rest { duration });
        } else {
            self.push_timed(Event::Note { pitch, duration });
        }
    }

    /// Pushes a note, rest or chord end, applying any pending broken-rhythm
    /// or tuplet scaling.
    fn push_timed(&mut self, mut event: Event) {
        if let Some(factor) = self.broken_next.take() {
            event.scale_duration(factor);
        }
        if let Some((factor, remaining)) = self.tuplet {
            event.scale_duration(factor);
            self.tuplet = if remaining > 1 { Some((factor, remaining - 1)) } else { None };
        }
        self.last_note = Some(self.tune.events.len());
        self.tune.events.push(event);
    }

    fn push_bar(&mut self, kind: BarKind) {
        if self.in_chord {
            self.warn("bar line inside chord".to_string());
        }
        self.bar_accidentals.clear();
        self.tune.events.push(Event::Bar(kind));
    }

    fn close_grace(&mut self, message: &str) {
        if self.in_grace {
            self.in_grace = false;
            self.tune.events.push(Event::GraceEnd);
            self.warn(message.to_string());
        }
    }

    fn read_colon_bar(&mut self, chars: &[char], i: &mut usize) {
        let mut colons = 1;
        while next_is(chars, *i, ':') {
            colons += 1;
            *i += 1;
        }
        let kind = if next_is(chars, *i, '|') {
            *i += 1;
            if next_is(chars, *i, '|') || next_is(chars, *i, ']') {
                *i += 1;
            }
            if next_is(chars, *i, ':') {
                while next_is(chars, *i, ':') {
                    *i += 1;
                }
                BarKind::DoubleRepeat
            } else {
                BarKind::RepeatClose
            }
        } else if colons >= 2 {
            BarKind::DoubleRepeat
        } else {
            self.warn("stray ':'".to_string());
            return;
        };
        self.push_bar(kind);
        skip_variant(chars, i);
    }

    fn read_open_bracket(&mut self, chars: &[char], i: &mut usize) {
        match (chars.get(*i), chars.get(*i + 1)) {
            (Some('|'), _) => {
                *i += 1;
                if next_is(chars, *i, ']') {
                    *i += 1;
                }
                self.push_bar(BarKind::Double);
            }
            (Some(d), _) if d.is_ascii_digit() => skip_variant_numbers(chars, i),
            (Some(field), Some(':')) if field.is_ascii_alphabetic() => {
                let field = *field;
                *i += 2;
                if !chars[*i..].contains(&']') {
                    self.warn(format!("unterminated inline field [{field}:"));
                }
                let value = read_until(chars, i, ']');
                self.read_field(field, &value);
            }
            _ => {
                if self.in_chord {
                    self.warn("nested chord".to_string());
                }
                self.in_chord = true;
                self.chord_start = Some(self.tune.events.len());
                self.chord_length = None;
                self.tune.events.push(Event::ChordStart);
            }
        }
    }

    fn end_chord(&mut self, chars: &[char], i: &mut usize) {
        if !self.in_chord {
            self.warn("unexpected ']'".to_string());
            return;
        }
        self.in_chord = false;
        let multiplier = self.read_multiplier(chars, i);
        let start = self.chord_start.take();
        match self.chord_length.take() {
            None => {
                if let Some(start) = start {
                    self.tune.events.truncate(start);
                    if self.last_note.map_or(false, |idx| idx >= start) {
                        self.last_note = None;
                    }
                }
                self.warn("empty chord".to_string());
            }
            Some(first) => {
                self.tie_pending = false;
                self.push_timed(Event::ChordEnd { duration: first * multiplier });
            }
        }
    }

    /// Marks the last note as tied; the next note becomes its continuation.
    fn tie(&mut self) {
        if self.in_chord || self.in_grace {
            return;
        }
        match self.last_note.and_then(|idx| self.tune.events.get(idx).cloned().map(|e| (idx, e))) {
            Some((idx, Event::Note { pitch, duration })) => {
                self.tune.events[idx] = Event::TiedNote { pitch, duration };
                self.tie_pending = true;
            }
            Some((_, Event::TiedNote { .. })) | Some((_, Event::Rest { .. })) => self.tie_pending = true,
            _ => {}
        }
    }

    fn broken_rhythm(&mut self, c: char, chars: &[char], i: &mut usize) {
        let mut dots: i32 = 1;
        while next_is(chars, *i, c) {
            dots += 1;
            *i += 1;
        }
        let short = Length::new(1, 1 << dots.min(8));
        let long = Length::from_integer(2) - short;
        let (before, after) = if c == '>' { (long, short) } else { (short, long) };
        if let Some(idx) = self.last_note {
            self.tune.events[idx].scale_duration(before);
        }
        self.broken_next = Some(after);
    }

    fn read_tuplet(&mut self, chars: &[char], i: &mut usize) {
        let p = read_number(chars, i).unwrap_or(0);
        let mut q = None;
        let mut r = None;
        if next_is(chars, *i, ':') {
            *i += 1;
            q = read_number(chars, i);
            if next_is(chars, *i, ':') {
                *i += 1;
                r = read_number(chars, i);
            }
        }
        let compound = self.meter.map_or(false, |ts| ts.num % 3 == 0 && ts.num > 3);
        let q = q.unwrap_or(match p {
            2 | 4 | 8 => 3,
            3 | 6 => 2,
            _ if compound => 3,
            _ => 2,
        });
        let r = r.unwrap_or(p);
        if p <= 0 || q <= 0 {
            self.warn(format!("bad tuplet ({p}:{q}"));
            return;
        }
        if r > 0 {
            self.tuplet = Some((Length::new(q, p), r));
        }
    }

    fn finish(mut self) -> Tune {
        if self.in_chord {
            self.warn("unterminated chord".to_string());
        }
        if !self.in_body {
            self.warn("no K: field".to_string());
        }
        self.tune
    }
}

/// Reads up to (and consumes) `end`, or to the end of the line.
fn read_until(chars: &[char], i: &mut usize, end: char) -> String {
    let start = *i;
    while *i < chars.len() && chars[*i] != end {
        *i += 1;
    }
    let text = chars[start..*i].iter().collect();
    if *i < chars.len() {
        *i += 1;
    }
    text
}

/// Skips an ending number such as `1`, `[2` or `1,3` after a bar line.
fn skip_variant(chars: &[char], i: &mut usize) {
    if next_is(chars, *i, '[') && chars.get(*i + 1).map_or(false, |c| c.is_ascii_digit()) {
        *i += 1;
    }
    skip_variant_numbers(chars, i);
}

fn skip_variant_numbers(chars: &[char], i: &mut usize) {
    if read_number(chars, i).is_none() {
        return;
    }
    while (next_is(chars, *i, ',') || next_is(chars, *i, '-'))
        && chars.get(*i + 1).map_or(false, |c| c.is_ascii_digit())
    {
        *i += 1;
        read_number(chars, i);
    }
}
