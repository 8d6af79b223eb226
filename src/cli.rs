use crate::config::{Contour, MatchSettings, RunMode, ScanConfig, SearchMode, DEFAULT_RESOLUTION};
use crate::notes::Units;
use clap::Parser;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flags spelled with a single dash on the command line.
const SINGLE_DASH_LONG_FLAGS: [&str; 7] = ["ign", "con", "qnt", "br", "ver", "pitch_hist", "length_hist"];

pub fn usage() -> String {
    format!(
        "barmatch version {VERSION}
Usage : barmatch <abc file> [-options]
        -c returns error and warning messages
        -v selects verbose option
        -r resolution for matching
        -con  pitch contour match
        -qnt contour quantization
        -ign  ignore simple bars
        -a report any matching bars (default all bars)
        -br %d only report number of matched bars when
            above given threshold
        -ver returns version number
        -pitch_hist pitch histogram
        -length_hist length histogram
The template bars are read from match.abc."
    )
}

#[derive(Parser, Debug, Clone)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Args {
    /// Corpus of tunes to search
    #[arg(value_name = "ABC_FILE")]
    pub corpus: Option<String>,

    /// Report reader warnings for every tune
    #[arg(short = 'c')]
    pub check: bool,

    /// Log per-tune progress
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Time units per sample; 0 compares notes exactly
    #[arg(short = 'r', default_value_t = DEFAULT_RESOLUTION, allow_negative_numbers = true)]
    pub resolution: Units,

    /// Report any matching bar instead of whole-template runs
    #[arg(short = 'a')]
    pub any: bool,

    /// Ignore bars with little melodic movement
    #[arg(long = "ign")]
    pub ignore_simple: bool,

    /// Match pitch contours instead of pitches
    #[arg(long = "con")]
    pub contour: bool,

    /// Quantize the contour steps
    #[arg(long = "qnt")]
    pub quantize: bool,

    /// Only count matched bars, reporting tunes at or above this threshold
    #[arg(long = "br", value_name = "N")]
    pub brief: Option<usize>,

    #[arg(long = "ver")]
    pub version: bool,

    #[arg(short = 'h')]
    pub help: bool,

    #[arg(long = "pitch_hist")]
    pub pitch_hist: bool,

    #[arg(long = "length_hist")]
    pub length_hist: bool,
}

impl Args {
    pub fn to_config(&self) -> ScanConfig {
        let contour = if self.quantize {
            Contour::Quantized
        } else if self.contour {
            Contour::Plain
        } else {
            Contour::Off
        };
        let settings = MatchSettings { resolution: self.resolution, ignore_simple: self.ignore_simple, contour };
        let run_mode = if self.pitch_hist || self.length_hist {
            RunMode::Histograms { pitch: self.pitch_hist, length: self.length_hist }
        } else if let Some(threshold) = self.brief {
            RunMode::Brief { threshold }
        } else if self.any {
            RunMode::Bars(SearchMode::AnyBar)
        } else {
            RunMode::Bars(SearchMode::Sequence)
        };
        let mut config = ScanConfig::new(run_mode, settings);
        config.check = self.check;
        config
    }
}

/// Rewrites `-ign`, `-br` and the other single-dash long flags as `--ign`
/// etc. so that clap can parse them.
pub fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.strip_prefix('-') {
            Some(name) if SINGLE_DASH_LONG_FLAGS.contains(&name) => format!("-{arg}"),
            _ => arg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Args {
        Args::try_parse_from(normalize_args(line.split_whitespace().map(|s| s.to_string()))).unwrap()
    }

    #[test]
    fn test_normalize() {
        let args: Vec<String> = ["barmatch", "tunes.abc", "-ign", "-r", "0", "--con", "-pitch_hist"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(normalize_args(args), vec!["barmatch", "tunes.abc", "--ign", "-r", "0", "--con", "--pitch_hist"]);
    }

    #[test]
    fn test_defaults() {
        let args = parse("barmatch tunes.abc");
        assert_eq!(args.corpus.as_deref(), Some("tunes.abc"));
        let config = args.to_config();
        assert_eq!(config.run_mode, RunMode::Bars(SearchMode::Sequence));
        assert_eq!(config.settings, MatchSettings::default());
        assert!(!config.check);
    }

    #[test]
    fn test_flags() {
        let config = parse("barmatch tunes.abc -a -r 6 -ign -qnt -c").to_config();
        assert_eq!(config.run_mode, RunMode::Bars(SearchMode::AnyBar));
        assert_eq!(config.settings.resolution, 6);
        assert!(config.settings.ignore_simple);
        assert_eq!(config.settings.contour, Contour::Quantized);
        assert!(config.check);
    }

    #[test]
    fn test_brief_and_histograms() {
        let brief = parse("barmatch tunes.abc -br 4 -r 12").to_config();
        assert_eq!(brief.run_mode, RunMode::Brief {threshold: 4});
        assert_eq!(brief.settings.resolution, 0);
        let hist = parse("barmatch tunes.abc -length_hist").to_config();
        assert_eq!(hist.run_mode, RunMode::Histograms {pitch: false, length: true});
    }

    #[test]
    fn test_version_and_help() {
        assert!(parse("barmatch -ver").version);
        let help = parse("barmatch -h");
        assert!(help.help);
        assert!(help.corpus.is_none());
        assert!(usage().contains("-pitch_hist"));
    }
}
