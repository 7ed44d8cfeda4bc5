//! Multi-factor pitch trend consistency between two aligned curves.

use serde::Serialize;

const DIRECTION_WEIGHT: f64 = 0.6;
const MAGNITUDE_WEIGHT: f64 = 0.25;
const PATTERN_WEIGHT: f64 = 0.15;
const MONOTONIC_SHAPE_RATIO: f64 = 0.7;

/// Coarse contour shape of a whole curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackShape {
    Flat,
    Rising,
    Falling,
    Dipping,
    Complex,
}

/// Components of the trend consistency score, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrendBreakdown {
    pub direction: f64,
    pub magnitude: f64,
    pub pattern: f64,
    pub consistency: f64,
}

/// Scores how well `user` follows the movements of `standard`. Inputs are
/// paired samples; fewer than 3 pairs score 0.
pub fn trend_consistency(standard: &[f64], user: &[f64]) -> TrendBreakdown {
    let len = standard.len().min(user.len());
    if len < 3 {
        return TrendBreakdown::default();
    }
    let std_diff = first_differences(&standard[..len]);
    let user_diff = first_differences(&user[..len]);

    let direction = direction_consistency(&std_diff, &user_diff);
    let magnitude = magnitude_consistency(&std_diff, &user_diff);
    let pattern = match (classify_shape(&std_diff), classify_shape(&user_diff)) {
        (Some(a), Some(b)) => shape_similarity(a, b),
        _ => 1.0,
    };
    let consistency = (direction * DIRECTION_WEIGHT
        + magnitude * MAGNITUDE_WEIGHT
        + pattern * PATTERN_WEIGHT)
        .clamp(0.0, 1.0);
    TrendBreakdown {
        direction,
        magnitude,
        pattern,
        consistency,
    }
}

pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Sign agreement of the first differences, weighted by the size of the
/// reference movement. A motionless reference weighs every step equally.
fn direction_consistency(std_diff: &[f64], user_diff: &[f64]) -> f64 {
    if std_diff.is_empty() {
        return 1.0;
    }
    let total: f64 = std_diff.iter().map(|d| d.abs()).sum();
    let uniform = 1.0 / std_diff.len() as f64;
    std_diff
        .iter()
        .zip(user_diff)
        .filter(|(s, u)| sign(**s) == sign(**u))
        .map(|(s, _)| if total > 0.0 { s.abs() / total } else { uniform })
        .sum()
}

fn magnitude_consistency(std_diff: &[f64], user_diff: &[f64]) -> f64 {
    if std_diff.is_empty() {
        return 1.0;
    }
    let std_scale = max_abs(std_diff) + 1e-6;
    let user_scale = max_abs(user_diff) + 1e-6;
    let similarity = std_diff
        .iter()
        .zip(user_diff)
        .map(|(s, u)| 1.0 - (s.abs() / std_scale - u.abs() / user_scale).abs())
        .sum::<f64>()
        / std_diff.len() as f64;
    similarity.clamp(0.0, 1.0)
}

/// Classifies a curve from its first differences; `None` below two steps.
pub fn classify_shape(diff: &[f64]) -> Option<TrackShape> {
    if diff.len() < 2 {
        return None;
    }
    let total: f64 = diff.iter().sum();
    let travelled: f64 = diff.iter().map(|d| d.abs()).sum();
    if total.abs() <= std_dev(diff) * 0.5 || travelled == 0.0 {
        return Some(TrackShape::Flat);
    }
    let monotonicity = total.abs() / travelled;
    if monotonicity > MONOTONIC_SHAPE_RATIO {
        return Some(if total > 0.0 {
            TrackShape::Rising
        } else {
            TrackShape::Falling
        });
    }
    let direction_changes: f64 = diff
        .windows(2)
        .map(|w| (sign(w[1]) - sign(w[0])).abs())
        .sum();
    if direction_changes >= 2.0 {
        Some(TrackShape::Dipping)
    } else {
        Some(TrackShape::Complex)
    }
}

pub fn shape_similarity(a: TrackShape, b: TrackShape) -> f64 {
    use TrackShape::*;
    match (a, b) {
        (Complex, Complex) => 0.8,
        _ if a == b => 1.0,
        (Flat, Rising) | (Rising, Flat) | (Flat, Falling) | (Falling, Flat) => 0.3,
        (Rising, Falling) | (Falling, Rising) => 0.2,
        (Dipping, Complex) | (Complex, Dipping) => 0.6,
        _ => 0.4,
    }
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

fn std_dev(values: &[f64]) -> f64 {
    let len = values.len() as f64;
    let mean = values.iter().sum::<f64>() / len;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len).sqrt()
}
