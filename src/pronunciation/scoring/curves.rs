//! Piecewise-linear maps from metric values to 0-100 scores.

use crate::config::TierThresholds;

/// Score for a metric where larger values are better and 1.0 is perfect.
///
/// excellent and above maps to 95-100, good to 80-95, fair to 60-80,
/// poor to 30-60 and anything lower ramps linearly down to 0.
pub fn higher_is_better(value: f64, tiers: &TierThresholds) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let score = if value >= tiers.excellent {
        let headroom = 1.0 - tiers.excellent;
        if headroom > 0.0 {
            95.0 + 5.0 * (value - tiers.excellent) / headroom
        } else {
            100.0
        }
    } else if value >= tiers.good {
        80.0 + 15.0 * (value - tiers.good) / (tiers.excellent - tiers.good)
    } else if value >= tiers.fair {
        60.0 + 20.0 * (value - tiers.fair) / (tiers.good - tiers.fair)
    } else if value >= tiers.poor {
        30.0 + 30.0 * (value - tiers.poor) / (tiers.fair - tiers.poor)
    } else if tiers.poor > 0.0 {
        30.0 * value / tiers.poor
    } else {
        0.0
    };
    score.clamp(0.0, 100.0)
}

/// Score for a metric where smaller values are better and 0 is perfect.
/// Past `poor` the score ramps from 30 down to 0 at twice `poor`.
pub fn lower_is_better(value: f64, tiers: &TierThresholds) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let value = value.max(0.0);
    let score = if value <= tiers.excellent {
        95.0 + 5.0 * (tiers.excellent - value) / tiers.excellent
    } else if value <= tiers.good {
        80.0 + 15.0 * (tiers.good - value) / (tiers.good - tiers.excellent)
    } else if value <= tiers.fair {
        60.0 + 20.0 * (tiers.fair - value) / (tiers.fair - tiers.good)
    } else if value <= tiers.poor {
        30.0 + 30.0 * (tiers.poor - value) / (tiers.poor - tiers.fair)
    } else {
        30.0 * (1.0 - (value - tiers.poor) / tiers.poor)
    };
    score.clamp(0.0, 100.0)
}
