use crate::notes::Units;

pub const DEFAULT_RESOLUTION: Units = 12;
pub const DEFAULT_BRIEF_THRESHOLD: usize = 3;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SearchMode {
    /// Report every subject bar that matches some template bar.
    AnyBar,
    /// Report runs of consecutive subject bars matching the whole template.
    Sequence,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Contour {
    Off,
    Plain,
    Quantized,
}

impl Contour {
    pub fn is_on(&self) -> bool {
        *self != Contour::Off
    }

    pub fn quantized(&self) -> bool {
        *self == Contour::Quantized
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MatchSettings {
    /// Time units per sample; 0 compares note lists exactly.
    pub resolution: Units,
    pub ignore_simple: bool,
    pub contour: Contour,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            resolution: DEFAULT_RESOLUTION,
            ignore_simple: false,
            contour: Contour::Off,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RunMode {
    Bars(SearchMode),
    /// Count shared bars per tune and report tunes reaching the threshold.
    Brief { threshold: usize },
    Histograms { pitch: bool, length: bool },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScanConfig {
    pub run_mode: RunMode,
    pub settings: MatchSettings,
    /// Report reader warnings for every tune.
    pub check: bool,
}

impl ScanConfig {
    pub fn new(run_mode: RunMode, settings: MatchSettings) -> Self {
        let mut settings = settings;
        if let RunMode::Brief { .. } = run_mode {
            settings.resolution = 0;
        }
        ScanConfig { run_mode, settings, check: false }
    }

    pub fn needs_template(&self) -> bool {
        !matches!(self.run_mode, RunMode::Histograms { .. })
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig::new(RunMode::Bars(SearchMode::Sequence), MatchSettings::default())
    }
}
