use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::QualityConfig;
use crate::types::PitchTrack;

/// Outcome of the quality gate. Anything but `Ok` forces a zero score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    #[default]
    Ok,
    InsufficientData,
    InsufficientSpeech,
    SilenceDetected,
}

impl QualityFlag {
    pub fn is_fatal(self) -> bool {
        self != QualityFlag::Ok
    }
}

/// Upstream measurements that override values derived from the tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityHints {
    pub standard_valid_ratio: Option<f64>,
    pub user_valid_ratio: Option<f64>,
    pub valid_points: Option<usize>,
    /// RMS energy of the user recording, full scale = 1.0.
    pub energy: Option<f64>,
}

/// Marginal but usable input; scores are de-rated rather than zeroed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityWarning {
    pub valid_ratio: f64,
    pub valid_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityReport {
    pub flag: QualityFlag,
    pub standard_valid_ratio: f64,
    pub user_valid_ratio: f64,
    /// Jointly voiced aligned points once alignment ran, user voiced
    /// samples before.
    pub valid_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<QualityWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    config: QualityConfig,
}

impl QualityGate {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Checks voicing and energy before any alignment work is done.
    pub fn pre_check(
        &self,
        standard: &PitchTrack,
        user: &PitchTrack,
        hints: &QualityHints,
    ) -> QualityReport {
        let standard_valid_ratio = hints
            .standard_valid_ratio
            .unwrap_or_else(|| standard.valid_ratio());
        let user_valid_ratio = hints.user_valid_ratio.unwrap_or_else(|| user.valid_ratio());
        let valid_points = hints.valid_points.unwrap_or_else(|| user.voiced_count());

        let flag = if hints
            .energy
            .is_some_and(|energy| energy < self.config.silence_rms_threshold)
        {
            QualityFlag::SilenceDetected
        } else if standard_valid_ratio < self.config.min_standard_valid_ratio
            || user_valid_ratio < self.config.min_user_valid_ratio
        {
            QualityFlag::InsufficientSpeech
        } else {
            QualityFlag::Ok
        };
        if flag.is_fatal() {
            warn!(
                ?flag,
                standard_valid_ratio, user_valid_ratio, "input rejected by quality gate"
            );
        }
        QualityReport {
            flag,
            standard_valid_ratio,
            user_valid_ratio,
            valid_points,
            energy: hints.energy,
            warning: None,
        }
    }

    /// Re-evaluates a passing report with the jointly voiced point count of
    /// the aligned pair.
    pub fn post_check(&self, report: QualityReport, joint_points: usize) -> QualityReport {
        if report.flag.is_fatal() {
            return report;
        }
        if joint_points < self.config.min_joint_points {
            warn!(joint_points, "too few jointly voiced points after alignment");
            return QualityReport {
                flag: QualityFlag::InsufficientData,
                valid_points: joint_points,
                ..report
            };
        }
        let warning = (report.user_valid_ratio < self.config.marginal_valid_ratio
            || joint_points < self.config.marginal_valid_points)
            .then_some(QualityWarning {
                valid_ratio: report.user_valid_ratio,
                valid_points: joint_points,
            });
        debug!(joint_points, marginal = warning.is_some(), "quality gate passed");
        QualityReport {
            valid_points: joint_points,
            warning,
            ..report
        }
    }
}
