use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{EngineConfig, Locale};
use crate::pronunciation::alignment::{AlignmentStrategy, TimingHints};
use crate::pronunciation::quality::QualityHints;
use crate::pronunciation::tone::ToneLabel;
use crate::pronunciation::CompareOptions;

#[derive(Parser, Debug)]
#[command(
    name = "tonescore",
    about = "Score a learner's Mandarin pitch contour against a reference"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare two pitch tracks stored as JSON.
    Compare(CompareArgs),
    /// Extract pitch from two audio files and compare them.
    Analyze(AnalyzeArgs),
    /// Print the pitch track of an audio file as JSON.
    Extract(ExtractArgs),
    /// Print the default engine configuration as TOML.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Dtw,
    Linear,
}

impl From<StrategyArg> for AlignmentStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Dtw => AlignmentStrategy::Dtw,
            StrategyArg::Linear => AlignmentStrategy::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LocaleArg {
    En,
    Zh,
}

impl From<LocaleArg> for Locale {
    fn from(value: LocaleArg) -> Self {
        match value {
            LocaleArg::En => Locale::En,
            LocaleArg::Zh => Locale::Zh,
        }
    }
}

/// Options shared by `compare` and `analyze`.
#[derive(Args, Debug, Clone)]
pub struct ScoringArgs {
    /// Expected tone per syllable, e.g. `3,3` or `1,4,2`.
    #[arg(long, value_delimiter = ',', value_parser = parse_tone)]
    pub tones: Vec<ToneLabel>,
    #[arg(long, value_enum, default_value_t = StrategyArg::Dtw)]
    pub strategy: StrategyArg,
    /// RMS energy of the learner recording (full scale = 1.0).
    #[arg(long)]
    pub energy: Option<f64>,
    /// Engine configuration TOML; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides `feedback.locale` from the configuration.
    #[arg(long, value_enum)]
    pub locale: Option<LocaleArg>,
    /// JSON file with reference duration, ASR word spans or VAD segments.
    #[arg(long)]
    pub timing: Option<PathBuf>,
}

impl ScoringArgs {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(locale) = self.locale {
            config.feedback.locale = locale.into();
        }
        config.validate()?;
        Ok(config)
    }

    /// `energy` is used when `--energy` was not given.
    pub fn compare_options(&self, energy: Option<f64>) -> Result<CompareOptions> {
        let timing = match &self.timing {
            Some(path) => read_timing(path)?,
            None => TimingHints::default(),
        };
        Ok(CompareOptions {
            expected_tones: self.tones.clone(),
            quality_hints: QualityHints {
                energy: self.energy.or(energy),
                ..QualityHints::default()
            },
            strategy: self.strategy.into(),
            timing,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Reference pitch track JSON (`{"times": [...], "frequencies": [...]}`).
    #[arg(long)]
    pub standard: PathBuf,
    /// Learner pitch track JSON.
    #[arg(long)]
    pub user: PathBuf,
    #[command(flatten)]
    pub scoring: ScoringArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Reference recording (any format symphonia can decode).
    #[arg(long)]
    pub standard: PathBuf,
    /// Learner recording.
    #[arg(long)]
    pub user: PathBuf,
    #[command(flatten)]
    pub scoring: ScoringArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long)]
    pub input: PathBuf,
}

fn parse_tone(value: &str) -> std::result::Result<ToneLabel, String> {
    let number: u8 = value
        .trim()
        .parse()
        .map_err(|_| format!("tone must be a number from 0 to 4, got `{value}`"))?;
    ToneLabel::try_from(number)
}

fn read_timing(path: &Path) -> Result<TimingHints> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read timing hints {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse timing hints {}", path.display()))
}
