use serde::Serialize;
use tracing::{debug, info};

use crate::config::RegisterConfig;

/// Distribution summary of the voiced samples of one curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PitchStatistics {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub p25: f64,
    pub p75: f64,
    pub min: f64,
    pub max: f64,
}

impl PitchStatistics {
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let len = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / len;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len;
        Some(Self {
            mean,
            median: percentile(&sorted, 0.5),
            std: variance.sqrt(),
            p25: percentile(&sorted, 0.25),
            p75: percentile(&sorted, 0.75),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }

    pub fn iqr(&self) -> f64 {
        self.p75 - self.p25
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Percentile of a sorted slice with linear interpolation between ranks.
/// `p` is in [0.0, 1.0].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        len => {
            let rank = p.clamp(0.0, 1.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Which register correction, if any, was applied to the user curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegisterAdjustment {
    /// Too few voiced samples for reliable statistics.
    Skipped,
    /// Baseline difference within the adaptive threshold.
    Unchanged { baseline_diff: f64, threshold: f64 },
    /// Systemic offset: user recentred on the reference median and scaled.
    Rescaled {
        baseline_diff: f64,
        threshold: f64,
        scale_factor: f64,
    },
    /// Partial shift towards the reference median.
    Shifted {
        baseline_diff: f64,
        threshold: f64,
        shift_hz: f64,
    },
}

/// Removes a speaker pitch-range offset from the user curve while keeping
/// its contour. The reference curve is never modified.
#[derive(Debug, Clone, Default)]
pub struct RegisterAligner {
    config: RegisterConfig,
}

impl RegisterAligner {
    pub fn new(config: RegisterConfig) -> Self {
        Self { config }
    }

    pub fn align(&self, standard: &[Option<f64>], user: &mut [Option<f64>]) -> RegisterAdjustment {
        if !self.config.enabled {
            return RegisterAdjustment::Skipped;
        }
        let std_values: Vec<f64> = standard.iter().flatten().copied().collect();
        let user_values: Vec<f64> = user.iter().flatten().copied().collect();
        if std_values.len() < self.config.min_voiced || user_values.len() < self.config.min_voiced
        {
            debug!(
                standard_voiced = std_values.len(),
                user_voiced = user_values.len(),
                "register alignment skipped"
            );
            return RegisterAdjustment::Skipped;
        }
        let (Some(std_stats), Some(user_stats)) = (
            PitchStatistics::from_values(&std_values),
            PitchStatistics::from_values(&user_values),
        ) else {
            return RegisterAdjustment::Skipped;
        };

        let baseline_diff = user_stats.median - std_stats.median;
        let mean_diff = user_stats.mean - std_stats.mean;
        let threshold = self.adaptive_threshold(&std_stats);
        if baseline_diff.abs() <= threshold {
            return RegisterAdjustment::Unchanged {
                baseline_diff,
                threshold,
            };
        }

        if baseline_diff.abs() >= mean_diff.abs() * self.config.systemic_offset_ratio {
            let scale_factor = self.scale_factor(&std_stats, &user_stats, baseline_diff);
            for value in user.iter_mut().flatten() {
                *value = std_stats.median + (*value - user_stats.median) * scale_factor;
            }
            info!(
                baseline_diff,
                threshold, scale_factor, "rescaled user register onto reference baseline"
            );
            RegisterAdjustment::Rescaled {
                baseline_diff,
                threshold,
                scale_factor,
            }
        } else {
            let shift_hz = baseline_diff * self.config.light_shift_fraction;
            for value in user.iter_mut().flatten() {
                *value -= shift_hz;
            }
            info!(baseline_diff, threshold, shift_hz, "shifted user register");
            RegisterAdjustment::Shifted {
                baseline_diff,
                threshold,
                shift_hz,
            }
        }
    }

    /// A fraction of the reference IQR, clamped to the configured Hz band.
    pub fn adaptive_threshold(&self, standard: &PitchStatistics) -> f64 {
        (standard.iqr() * self.config.iqr_threshold_fraction)
            .clamp(self.config.threshold_min_hz, self.config.threshold_max_hz)
    }

    /// Scale in [0.3, 0.9]: larger offsets relative to the reference IQR get
    /// a more conservative factor.
    fn scale_factor(
        &self,
        standard: &PitchStatistics,
        user: &PitchStatistics,
        baseline_diff: f64,
    ) -> f64 {
        let std_iqr = standard.iqr();
        let user_iqr = user.iqr();
        if std_iqr <= 0.0 || user_iqr <= 0.0 {
            return 0.5;
        }
        let relative_diff = baseline_diff.abs() / std_iqr;
        let factor = if relative_diff > self.config.large_offset_relative {
            0.3 + 0.2 / (1.0 + relative_diff)
        } else {
            0.6 + 0.3 * (1.0 - relative_diff)
        };
        factor.clamp(0.3, 0.9)
    }
}
