pub mod curves;
pub mod feedback;

use serde::Serialize;
use tracing::debug;

use crate::config::{Locale, ScoringConfig};
use crate::pronunciation::metrics::ComparisonMetrics;
use crate::pronunciation::quality::{QualityFlag, QualityReport, QualityWarning};
use crate::pronunciation::tone::ToneAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Excellent,
    Good,
    Fair,
    Pass,
    NeedsImprovement,
}

impl ScoreLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 80.0 {
            Self::Good
        } else if score >= 70.0 {
            Self::Fair
        } else if score >= 60.0 {
            Self::Pass
        } else {
            Self::NeedsImprovement
        }
    }
}

/// Per-component scores in [0, 100]. `accuracy` is the correlation score
/// and `stability` the RMSE score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentScores {
    pub accuracy: f64,
    pub trend: f64,
    pub stability: f64,
    pub range: f64,
}

impl ComponentScores {
    fn rounded(self) -> Self {
        Self {
            accuracy: round1(self.accuracy),
            trend: round1(self.trend),
            stability: round1(self.stability),
            range: round1(self.range),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub total_score: f64,
    pub component_scores: ComponentScores,
    pub level: ScoreLevel,
    /// Points added to the trend component from tone accuracy.
    pub tone_enhancement: f64,
    pub feedback: String,
    pub quality_flag: QualityFlag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone_analysis: Option<ToneAnalysis>,
}

/// Maps metrics, tone results and quality flags to a 0-100 score.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
    locale: Locale,
}

impl Scorer {
    pub fn new(config: ScoringConfig, locale: Locale) -> Self {
        Self { config, locale }
    }

    pub fn score(
        &self,
        metrics: &ComparisonMetrics,
        tones: Option<&ToneAnalysis>,
        quality: Option<&QualityReport>,
    ) -> ScoreResult {
        let flag = match quality {
            Some(report) => report.flag,
            None if metrics.degenerate => QualityFlag::InsufficientData,
            None => QualityFlag::Ok,
        };
        if flag.is_fatal() {
            return self.rejected(flag, tones);
        }

        let mut components = self.component_scores(metrics);
        let warning = quality.and_then(|report| report.warning);
        if let Some(warning) = &warning {
            self.derate(&mut components, warning);
        }

        let tone_enhancement = tones
            .filter(|analysis| !analysis.syllables.is_empty())
            .map(|analysis| (analysis.accuracy * 10.0).clamp(0.0, self.config.tone_bonus_max))
            .unwrap_or(0.0);
        components.trend = (components.trend + tone_enhancement).min(100.0);

        let weights = &self.config.weights;
        let total = (components.accuracy * weights.correlation
            + components.trend * weights.trend
            + components.stability * weights.stability
            + components.range * weights.range)
            .clamp(0.0, 100.0);
        let total_score = round1(total);
        let level = ScoreLevel::from_score(total_score);
        let components = components.rounded();
        debug!(
            total_score,
            accuracy = components.accuracy,
            trend = components.trend,
            stability = components.stability,
            range = components.range,
            tone_enhancement,
            "scored comparison"
        );

        ScoreResult {
            total_score,
            component_scores: components,
            level,
            tone_enhancement: round1(tone_enhancement),
            feedback: feedback::compose(level, &components, tones, self.locale),
            quality_flag: flag,
            quality_warning: warning.map(|w| feedback::quality_note(&w, self.locale)),
            tone_analysis: tones.cloned(),
        }
    }

    /// Unweighted component scores before de-rating and tone bonus.
    pub fn component_scores(&self, metrics: &ComparisonMetrics) -> ComponentScores {
        let config = &self.config;
        let accuracy = if metrics.correlation <= config.correlation_negative_cutoff
            || metrics.correlation < config.correlation_floor
        {
            0.0
        } else {
            curves::higher_is_better(metrics.correlation, &config.correlation)
        };
        ComponentScores {
            accuracy,
            trend: curves::higher_is_better(metrics.trend_consistency, &config.trend),
            stability: curves::lower_is_better(metrics.rmse_hz, &config.rmse_hz),
            range: curves::higher_is_better(metrics.pitch_range_ratio, &config.range),
        }
    }

    /// Blend of the valid-ratio and valid-points tiers, in (0, 1].
    pub fn derating_factor(&self, warning: &QualityWarning) -> f64 {
        let derating = &self.config.derating;
        derating.ratio_weight * ratio_tier(warning.valid_ratio)
            + derating.points_weight * points_tier(warning.valid_points)
    }

    fn derate(&self, components: &mut ComponentScores, warning: &QualityWarning) {
        let factor = self.derating_factor(warning);
        let derating = &self.config.derating;
        components.accuracy *= factor * derating.correlation;
        components.stability *= factor * derating.stability;
        components.trend *= factor * derating.trend;
        components.range *= factor * derating.range;
        debug!(factor, "de-rated marginal quality scores");
    }

    fn rejected(&self, flag: QualityFlag, tones: Option<&ToneAnalysis>) -> ScoreResult {
        ScoreResult {
            total_score: 0.0,
            component_scores: ComponentScores::default(),
            level: ScoreLevel::NeedsImprovement,
            tone_enhancement: 0.0,
            feedback: feedback::gate_message(flag, self.locale),
            quality_flag: flag,
            quality_warning: None,
            tone_analysis: tones.cloned(),
        }
    }
}

fn ratio_tier(valid_ratio: f64) -> f64 {
    if valid_ratio >= 0.7 {
        1.0
    } else if valid_ratio >= 0.5 {
        0.95
    } else if valid_ratio >= 0.3 {
        0.9
    } else {
        0.85
    }
}

fn points_tier(valid_points: usize) -> f64 {
    if valid_points >= 50 {
        1.0
    } else if valid_points >= 30 {
        0.95
    } else if valid_points >= 15 {
        0.9
    } else {
        0.85
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pronunciation::metrics::{TrackSummary, TrendBreakdown};

    fn metrics(correlation: f64, rmse_hz: f64, trend: f64, range: f64) -> ComparisonMetrics {
        ComparisonMetrics {
            correlation,
            rmse_hz,
            trend_consistency: trend,
            pitch_range_ratio: range,
            valid_point_count: 100,
            standard: TrackSummary::default(),
            user: TrackSummary::default(),
            trend: TrendBreakdown::default(),
            degenerate: false,
        }
    }

    fn report(flag: QualityFlag, warning: Option<QualityWarning>) -> QualityReport {
        QualityReport {
            flag,
            standard_valid_ratio: 1.0,
            user_valid_ratio: 1.0,
            valid_points: 100,
            energy: None,
            warning,
        }
    }

    #[test]
    fn perfect_metrics_score_excellent() {
        let result = Scorer::default().score(&metrics(1.0, 0.0, 1.0, 1.0), None, None);
        assert_eq!(result.total_score, 100.0);
        assert_eq!(result.level, ScoreLevel::Excellent);
        assert_eq!(result.quality_flag, QualityFlag::Ok);
    }

    #[test]
    fn fatal_flags_zero_everything() {
        for flag in [
            QualityFlag::InsufficientData,
            QualityFlag::InsufficientSpeech,
            QualityFlag::SilenceDetected,
        ] {
            let result = Scorer::default().score(
                &metrics(1.0, 0.0, 1.0, 1.0),
                None,
                Some(&report(flag, None)),
            );
            assert_eq!(result.total_score, 0.0);
            assert_eq!(result.component_scores, ComponentScores::default());
            assert_eq!(result.quality_flag, flag);
            assert!(!result.feedback.is_empty());
        }
    }

    #[test]
    fn degenerate_metrics_without_report_are_rejected() {
        let result = Scorer::default().score(&ComparisonMetrics::degenerate(), None, None);
        assert_eq!(result.quality_flag, QualityFlag::InsufficientData);
        assert_eq!(result.total_score, 0.0);
    }

    #[test]
    fn weak_or_negative_correlation_scores_zero_accuracy() {
        let scorer = Scorer::default();
        assert_eq!(scorer.component_scores(&metrics(0.1, 0.0, 1.0, 1.0)).accuracy, 0.0);
        assert_eq!(scorer.component_scores(&metrics(-0.5, 0.0, 1.0, 1.0)).accuracy, 0.0);
        assert!(scorer.component_scores(&metrics(0.2, 0.0, 1.0, 1.0)).accuracy > 0.0);
    }

    #[test]
    fn marginal_quality_derates_each_component() {
        let scorer = Scorer::default();
        let warning = QualityWarning {
            valid_ratio: 0.35,
            valid_points: 18,
        };
        assert!((scorer.derating_factor(&warning) - 0.9).abs() < 1e-12);
        let clean = scorer.score(
            &metrics(0.9, 10.0, 0.9, 0.9),
            None,
            Some(&report(QualityFlag::Ok, None)),
        );
        let derated = scorer.score(
            &metrics(0.9, 10.0, 0.9, 0.9),
            None,
            Some(&report(QualityFlag::Ok, Some(warning))),
        );
        assert!(derated.total_score < clean.total_score);
        assert!(derated.quality_warning.is_some());
        assert!(derated.component_scores.accuracy < clean.component_scores.accuracy);
    }

    #[test]
    fn tone_accuracy_boosts_trend_up_to_cap() {
        use crate::pronunciation::tone::{
            MatchKind, SyllableTone, ToneLabel, ToneMatch, ToneObservation,
        };
        let tones = ToneAnalysis {
            syllables: vec![SyllableTone {
                index: 0,
                start: 0.0,
                end: 0.4,
                expected: ToneLabel::Rising,
                detected: ToneObservation {
                    label: ToneLabel::Rising,
                    confidence: 0.9,
                    features: None,
                    rule: "rising",
                },
                comparison: ToneMatch {
                    similarity: 1.0,
                    is_match: true,
                    kind: MatchKind::Exact,
                },
            }],
            accuracy: 0.9,
        };
        let scorer = Scorer::default();
        let base = scorer.score(&metrics(0.6, 50.0, 0.6, 0.6), None, None);
        let boosted = scorer.score(&metrics(0.6, 50.0, 0.6, 0.6), Some(&tones), None);
        assert_eq!(boosted.tone_enhancement, 9.0);
        assert!((boosted.component_scores.trend - base.component_scores.trend - 9.0).abs() < 0.11);
        assert!(boosted.tone_analysis.is_some());

        let capped = scorer.score(&metrics(1.0, 0.0, 1.0, 1.0), Some(&tones), None);
        assert_eq!(capped.component_scores.trend, 100.0);
    }

    #[test]
    fn levels_follow_score_bands() {
        assert_eq!(ScoreLevel::from_score(95.0), ScoreLevel::Excellent);
        assert_eq!(ScoreLevel::from_score(85.0), ScoreLevel::Good);
        assert_eq!(ScoreLevel::from_score(75.0), ScoreLevel::Fair);
        assert_eq!(ScoreLevel::from_score(60.0), ScoreLevel::Pass);
        assert_eq!(ScoreLevel::from_score(59.9), ScoreLevel::NeedsImprovement);
    }

    #[test]
    fn feedback_is_localized() {
        let scorer = Scorer::new(ScoringConfig::default(), Locale::Zh);
        let result = scorer.score(&metrics(0.2, 150.0, 0.2, 0.2), None, None);
        assert!(result.feedback.contains("需要改进"));
        assert!(result.feedback.lines().count() >= 3);
    }
}
