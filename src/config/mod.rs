use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Process-wide engine settings: every threshold and weight used by the
/// comparison pipeline.
///
/// Load once, wrap in an `Arc`, and share read-only between comparisons.
/// Every field falls back to its default when missing from the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub alignment: AlignmentConfig,
    pub quality: QualityConfig,
    pub tone: ToneConfig,
    pub scoring: ScoringConfig,
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// When false the aligner always resamples linearly.
    pub dtw_enabled: bool,
    /// Both interpolated tracks must be longer than this to use DTW.
    pub dtw_min_samples: usize,
    /// Lower bound on the length of the linear resampling axis.
    pub linear_min_points: usize,
    pub register: RegisterConfig,
}

/// Baseline (speaker register) alignment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterConfig {
    pub enabled: bool,
    /// Voiced samples required in each curve before statistics are trusted.
    pub min_voiced: usize,
    /// Fraction of the reference IQR used as the offset threshold.
    pub iqr_threshold_fraction: f64,
    pub threshold_min_hz: f64,
    pub threshold_max_hz: f64,
    /// Median offset at least this multiple of the mean offset counts as a
    /// systemic register difference.
    pub systemic_offset_ratio: f64,
    /// Share of the median offset removed by the light shift.
    pub light_shift_fraction: f64,
    /// Offset / reference IQR above which the conservative scale is used.
    pub large_offset_relative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_standard_valid_ratio: f64,
    pub min_user_valid_ratio: f64,
    pub min_joint_points: usize,
    /// RMS energy (linear, full scale = 1.0) below which a recording is silent.
    pub silence_rms_threshold: f64,
    pub marginal_valid_ratio: f64,
    pub marginal_valid_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub flat_tolerance: f64,
    pub rising_slope: f64,
    pub rising_monotonic: f64,
    pub falling_slope: f64,
    pub falling_monotonic: f64,
    pub dipping_complexity: f64,
    pub dipping_peak_position: f64,
    /// Minimum span, in octaves, used when normalizing a segment to [0, 1].
    pub min_span_octaves: f64,
    pub importance: ToneImportance,
}

/// Per-tone weights for the utterance tone accuracy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneImportance {
    pub neutral: f64,
    pub high_level: f64,
    pub rising: f64,
    pub dipping: f64,
    pub falling: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub correlation: TierThresholds,
    /// Correlations below this score zero.
    pub correlation_floor: f64,
    /// Correlations at or below this score zero (inverted contours).
    pub correlation_negative_cutoff: f64,
    /// Lower is better; `poor` is the largest value.
    pub rmse_hz: TierThresholds,
    pub trend: TierThresholds,
    pub range: TierThresholds,
    pub tone_bonus_max: f64,
    pub derating: DeratingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub correlation: f64,
    pub trend: f64,
    pub stability: f64,
    pub range: f64,
}

/// Named breakpoints of a 4-tier piecewise-linear score curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub poor: f64,
    pub fair: f64,
    pub good: f64,
    pub excellent: f64,
}

/// Soft de-rating applied when the quality gate raises a non-fatal warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeratingConfig {
    pub ratio_weight: f64,
    pub points_weight: f64,
    pub correlation: f64,
    pub stability: f64,
    pub trend: f64,
    pub range: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub locale: Locale,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            dtw_enabled: true,
            dtw_min_samples: 10,
            linear_min_points: 100,
            register: RegisterConfig::default(),
        }
    }
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_voiced: 5,
            iqr_threshold_fraction: 0.4,
            threshold_min_hz: 30.0,
            threshold_max_hz: 80.0,
            systemic_offset_ratio: 1.5,
            light_shift_fraction: 0.5,
            large_offset_relative: 0.5,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_standard_valid_ratio: 0.15,
            min_user_valid_ratio: 0.10,
            min_joint_points: 3,
            silence_rms_threshold: 0.01,
            marginal_valid_ratio: 0.4,
            marginal_valid_points: 20,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            flat_tolerance: 0.15,
            rising_slope: 0.3,
            rising_monotonic: 0.7,
            falling_slope: -0.3,
            falling_monotonic: 0.3,
            dipping_complexity: 0.4,
            dipping_peak_position: 0.3,
            min_span_octaves: 0.25,
            importance: ToneImportance::default(),
        }
    }
}

impl Default for ToneImportance {
    fn default() -> Self {
        Self {
            neutral: 0.8,
            high_level: 1.0,
            rising: 1.2,
            dipping: 1.5,
            falling: 1.3,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            correlation: TierThresholds::new(0.30, 0.50, 0.70, 0.85),
            correlation_floor: 0.15,
            correlation_negative_cutoff: -0.1,
            rmse_hz: TierThresholds::new(100.0, 60.0, 40.0, 20.0),
            trend: TierThresholds::new(0.35, 0.50, 0.65, 0.80),
            range: TierThresholds::new(0.30, 0.50, 0.70, 0.85),
            tone_bonus_max: 10.0,
            derating: DeratingConfig::default(),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            correlation: 0.25,
            trend: 0.50,
            stability: 0.15,
            range: 0.10,
        }
    }
}

impl Default for DeratingConfig {
    fn default() -> Self {
        Self {
            ratio_weight: 0.6,
            points_weight: 0.4,
            correlation: 0.95,
            stability: 0.97,
            trend: 0.98,
            range: 0.99,
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::new(0.30, 0.50, 0.70, 0.85)
    }
}

impl TierThresholds {
    pub const fn new(poor: f64, fair: f64, good: f64, excellent: f64) -> Self {
        Self {
            poor,
            fair,
            good,
            excellent,
        }
    }

    fn is_increasing(&self) -> bool {
        self.poor < self.fair && self.fair < self.good && self.good < self.excellent
    }

    fn is_decreasing(&self) -> bool {
        self.poor > self.fair && self.fair > self.good && self.good > self.excellent
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.correlation + self.trend + self.stability + self.range
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file. The file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config at {:?}", path))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("invalid engine config at {:?}", path))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize engine config")
    }

    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        ensure!(
            (scoring.weights.total() - 1.0).abs() <= 1e-6,
            "score weights must sum to 1, got {:.6}",
            scoring.weights.total()
        );
        for (name, tiers) in [
            ("correlation", &scoring.correlation),
            ("trend", &scoring.trend),
            ("range", &scoring.range),
        ] {
            ensure!(
                tiers.is_increasing(),
                "{name} thresholds must increase from poor to excellent"
            );
        }
        ensure!(
            scoring.rmse_hz.is_decreasing() && scoring.rmse_hz.excellent > 0.0,
            "rmse_hz thresholds must decrease from poor to excellent"
        );
        ensure!(
            scoring.tone_bonus_max >= 0.0,
            "tone_bonus_max must not be negative"
        );

        let quality = &self.quality;
        for (name, ratio) in [
            ("min_standard_valid_ratio", quality.min_standard_valid_ratio),
            ("min_user_valid_ratio", quality.min_user_valid_ratio),
            ("marginal_valid_ratio", quality.marginal_valid_ratio),
        ] {
            ensure!(
                (0.0..=1.0).contains(&ratio),
                "{name} must lie in [0, 1], got {ratio}"
            );
        }
        ensure!(
            quality.min_joint_points >= 3,
            "min_joint_points must be at least 3"
        );

        let register = &self.alignment.register;
        ensure!(
            register.threshold_min_hz <= register.threshold_max_hz,
            "register threshold_min_hz must not exceed threshold_max_hz"
        );
        ensure!(
            self.tone.min_span_octaves > 0.0,
            "tone.min_span_octaves must be positive"
        );
        Ok(())
    }
}
