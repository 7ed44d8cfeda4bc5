pub mod trend;

use serde::Serialize;
use tracing::debug;

use crate::types::AlignedPitchPair;

pub use trend::{TrackShape, TrendBreakdown};

/// RMSE reported when the error cannot be computed.
pub const RMSE_SENTINEL_HZ: f64 = 1000.0;
const MIN_JOINT_POINTS: usize = 3;
/// Spread below which a curve counts as perfectly level.
const FLAT_STD_HZ: f64 = 1e-9;

/// Mean and spread of one curve over the jointly voiced positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrackSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl TrackSummary {
    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let len = values.len() as f64;
        let mean = values.iter().sum::<f64>() / len;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len).sqrt();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            mean: finite_or(mean, 0.0),
            std: finite_or(std, 0.0),
            min,
            max,
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Scalar comparison of an aligned pair. Always finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMetrics {
    pub correlation: f64,
    pub rmse_hz: f64,
    pub trend_consistency: f64,
    pub pitch_range_ratio: f64,
    pub valid_point_count: usize,
    pub standard: TrackSummary,
    pub user: TrackSummary,
    pub trend: TrendBreakdown,
    /// Fewer than 3 jointly voiced positions.
    pub degenerate: bool,
}

impl ComparisonMetrics {
    /// Worst-case metrics for a pair that cannot be compared.
    pub fn degenerate() -> Self {
        Self::degenerate_with(0)
    }

    fn degenerate_with(valid_point_count: usize) -> Self {
        Self {
            correlation: 0.0,
            rmse_hz: RMSE_SENTINEL_HZ,
            trend_consistency: 0.0,
            pitch_range_ratio: 0.0,
            valid_point_count,
            standard: TrackSummary::default(),
            user: TrackSummary::default(),
            trend: TrendBreakdown::default(),
            degenerate: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(&self, pair: &AlignedPitchPair) -> ComparisonMetrics {
        let (standard, user) = pair.jointly_voiced();
        if standard.len() < MIN_JOINT_POINTS {
            debug!(valid_points = standard.len(), "too few jointly voiced points");
            return ComparisonMetrics::degenerate_with(standard.len());
        }

        let standard_summary = TrackSummary::from_values(&standard);
        let user_summary = TrackSummary::from_values(&user);
        let trend = trend::trend_consistency(&standard, &user);
        let both_level = standard_summary.std < FLAT_STD_HZ && user_summary.std < FLAT_STD_HZ;
        let correlation = if both_level {
            // two level curves share their shape exactly
            1.0
        } else {
            pearson(&standard, &user)
        };
        let metrics = ComparisonMetrics {
            correlation,
            rmse_hz: rmse(&standard, &user),
            trend_consistency: finite_or(trend.consistency, 0.0),
            pitch_range_ratio: range_ratio(standard_summary.range(), user_summary.range()),
            valid_point_count: standard.len(),
            standard: standard_summary,
            user: user_summary,
            trend,
            degenerate: false,
        };
        debug!(
            correlation = metrics.correlation,
            rmse_hz = metrics.rmse_hz,
            trend = metrics.trend_consistency,
            range_ratio = metrics.pitch_range_ratio,
            valid_points = metrics.valid_point_count,
            "computed comparison metrics"
        );
        metrics
    }
}

/// Pearson coefficient; 0 when either series has no variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len < 2 {
        return 0.0;
    }
    let mean_a = a[..len].iter().sum::<f64>() / len as f64;
    let mean_b = b[..len].iter().sum::<f64>() / len as f64;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    finite_or(cov / (var_a.sqrt() * var_b.sqrt()), 0.0).clamp(-1.0, 1.0)
}

pub fn rmse(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return RMSE_SENTINEL_HZ;
    }
    let mse = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / len as f64;
    finite_or(mse.sqrt(), RMSE_SENTINEL_HZ).min(RMSE_SENTINEL_HZ)
}

/// Symmetric ratio of the two pitch ranges in [0, 1].
pub fn range_ratio(standard_range: f64, user_range: f64) -> f64 {
    if standard_range > 0.0 {
        if user_range <= 0.0 {
            return 0.0;
        }
        let ratio = (user_range / standard_range).min(standard_range / user_range);
        finite_or(ratio, 0.0).clamp(0.0, 1.0)
    } else if user_range == 0.0 {
        1.0
    } else {
        0.0
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
