use serde::Serialize;

/// Shape descriptors of one syllable, computed on a log2 pitch scale
/// normalized to [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ToneFeatures {
    pub mean: f64,
    pub std: f64,
    pub range: f64,
    /// Last minus first normalized value.
    pub total_change: f64,
    /// `total_change` per second.
    pub slope: f64,
    /// Fraction of rising steps.
    pub monotonic_ratio: f64,
    /// Direction changes per step.
    pub complexity: f64,
    pub peak_position: f64,
    pub valley_position: f64,
    pub duration: f64,
    /// Least-squares slope per sample of each half; set from 6 samples up.
    pub first_half_slope: Option<f64>,
    pub second_half_slope: Option<f64>,
}

impl ToneFeatures {
    /// `None` when fewer than two positive samples are paired with times.
    pub fn extract(values: &[f64], times: &[f64], min_span_octaves: f64) -> Option<Self> {
        let (values, times): (Vec<f64>, Vec<f64>) = values
            .iter()
            .zip(times)
            .filter(|(v, t)| v.is_finite() && **v > 0.0 && t.is_finite())
            .map(|(v, t)| (*v, *t))
            .unzip();
        if values.len() < 2 {
            return None;
        }
        let pitch = normalize_log_pitch(&values, min_span_octaves);
        let len = pitch.len() as f64;

        let mean = pitch.iter().sum::<f64>() / len;
        let std = (pitch.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / len).sqrt();
        let (valley_idx, min) = extreme(&pitch, |a, b| a < b);
        let (peak_idx, max) = extreme(&pitch, |a, b| a > b);
        let total_change = pitch[pitch.len() - 1] - pitch[0];
        let duration = times[times.len() - 1] - times[0];
        let slope = if duration > 0.0 {
            total_change / duration
        } else {
            0.0
        };

        let diff: Vec<f64> = pitch.windows(2).map(|w| w[1] - w[0]).collect();
        let steps = diff.len() as f64;
        let monotonic_ratio = diff.iter().filter(|d| **d > 0.0).count() as f64 / steps;
        let complexity = diff
            .windows(2)
            .map(|w| (signum(w[1]) - signum(w[0])).abs())
            .sum::<f64>()
            / steps;

        let mid = pitch.len() / 2;
        let (first_half_slope, second_half_slope) = if mid > 2 {
            (
                Some(index_slope(&pitch[..mid])),
                Some(index_slope(&pitch[mid..])),
            )
        } else {
            (None, None)
        };

        Some(Self {
            mean,
            std,
            range: max - min,
            total_change,
            slope,
            monotonic_ratio,
            complexity,
            peak_position: peak_idx as f64 / len,
            valley_position: valley_idx as f64 / len,
            duration,
            first_half_slope,
            second_half_slope,
        })
    }
}

/// log2 relative to the minimum, divided by `max(span, min_span_octaves)`.
fn normalize_log_pitch(values: &[f64], min_span_octaves: f64) -> Vec<f64> {
    let floor = values.iter().copied().fold(f64::INFINITY, f64::min);
    let log: Vec<f64> = values.iter().map(|v| (v / floor).log2()).collect();
    let span = log.iter().copied().fold(0.0, f64::max);
    let scale = span.max(min_span_octaves).max(f64::EPSILON);
    log.into_iter().map(|v| v / scale).collect()
}

/// First index whose value beats every other under `better`.
fn extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> (usize, f64) {
    values
        .iter()
        .enumerate()
        .fold((0, values[0]), |(best_idx, best), (idx, &value)| {
            if better(value, best) {
                (idx, value)
            } else {
                (best_idx, best)
            }
        })
}

fn index_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn signum(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
