//! Ordered tone classification rules. The first matching rule wins; the
//! fallback applies when none match.

use crate::config::ToneConfig;

use super::features::ToneFeatures;
use super::ToneLabel;

const HALF_TREND_FALL: f64 = -0.05;
const HALF_TREND_RISE: f64 = 0.05;
const HALF_TREND_VALLEY: (f64, f64) = (0.2, 0.8);
const HALF_TREND_MIN_RANGE: f64 = 0.15;

pub struct ToneRule {
    pub name: &'static str,
    pub label: ToneLabel,
    pub confidence: f64,
    pub applies: fn(&ToneFeatures, &ToneConfig) -> bool,
}

pub const RULES: &[ToneRule] = &[
    ToneRule {
        name: "flat",
        label: ToneLabel::HighLevel,
        confidence: 0.8,
        applies: |f, c| f.total_change.abs() < c.flat_tolerance,
    },
    ToneRule {
        name: "rising",
        label: ToneLabel::Rising,
        confidence: 0.9,
        applies: |f, c| f.slope > c.rising_slope && f.monotonic_ratio > c.rising_monotonic,
    },
    ToneRule {
        name: "falling",
        label: ToneLabel::Falling,
        confidence: 0.9,
        applies: |f, c| f.slope < c.falling_slope && f.monotonic_ratio < c.falling_monotonic,
    },
    ToneRule {
        name: "complex_dip",
        label: ToneLabel::Dipping,
        confidence: 0.7,
        applies: |f, c| {
            f.complexity > c.dipping_complexity && f.peak_position < c.dipping_peak_position
        },
    },
    ToneRule {
        name: "half_trend_dip",
        label: ToneLabel::Dipping,
        confidence: 0.75,
        applies: |f, _| match (f.first_half_slope, f.second_half_slope) {
            (Some(first), Some(second)) => {
                first < HALF_TREND_FALL
                    && second > HALF_TREND_RISE
                    && f.valley_position > HALF_TREND_VALLEY.0
                    && f.valley_position < HALF_TREND_VALLEY.1
                    && f.range > HALF_TREND_MIN_RANGE
            }
            _ => false,
        },
    },
];

/// Direction of the overall change when no rule matched.
pub fn fallback(features: &ToneFeatures) -> (ToneLabel, f64) {
    if features.total_change > 0.0 {
        (ToneLabel::Rising, 0.5)
    } else if features.total_change < 0.0 {
        (ToneLabel::Falling, 0.5)
    } else {
        (ToneLabel::Neutral, 0.4)
    }
}

/// Returns the label, confidence and name of the deciding rule.
pub fn evaluate(features: &ToneFeatures, config: &ToneConfig) -> (ToneLabel, f64, &'static str) {
    RULES
        .iter()
        .find(|rule| (rule.applies)(features, config))
        .map(|rule| (rule.label, rule.confidence, rule.name))
        .unwrap_or_else(|| {
            let (label, confidence) = fallback(features);
            (label, confidence, "fallback")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> ToneFeatures {
        ToneFeatures {
            total_change: 0.5,
            monotonic_ratio: 0.5,
            ..ToneFeatures::default()
        }
    }

    #[test]
    fn rules_are_evaluated_in_priority_order() {
        let config = ToneConfig::default();
        let flat = ToneFeatures {
            total_change: 0.05,
            slope: 5.0,
            monotonic_ratio: 1.0,
            ..ToneFeatures::default()
        };
        assert_eq!(evaluate(&flat, &config).2, "flat");

        let rising = ToneFeatures {
            slope: 1.0,
            monotonic_ratio: 0.8,
            ..features()
        };
        assert_eq!(evaluate(&rising, &config), (ToneLabel::Rising, 0.9, "rising"));
    }

    #[test]
    fn complex_dip_requires_early_peak() {
        let config = ToneConfig::default();
        let early = ToneFeatures {
            complexity: 0.6,
            peak_position: 0.1,
            ..features()
        };
        assert_eq!(evaluate(&early, &config).0, ToneLabel::Dipping);
        let late = ToneFeatures {
            peak_position: 0.6,
            ..early
        };
        assert_eq!(evaluate(&late, &config).2, "fallback");
    }

    #[test]
    fn fallback_follows_sign_of_change() {
        let config = ToneConfig::default();
        let down = ToneFeatures {
            total_change: -0.4,
            ..ToneFeatures::default()
        };
        assert_eq!(evaluate(&down, &config), (ToneLabel::Falling, 0.5, "fallback"));
        assert_eq!(fallback(&ToneFeatures::default()), (ToneLabel::Neutral, 0.4));
    }
}
