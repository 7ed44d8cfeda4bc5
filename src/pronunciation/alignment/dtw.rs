use ndarray::Array2;

use crate::pronunciation::{ErrorKind, PronunciationError, Result};

/// Warping path produced by the DTW solver.
#[derive(Debug, Clone, PartialEq)]
pub struct DtwAlignment {
    /// Index pairs `(reference, learner)`, monotonic in both coordinates,
    /// starting at `(0, 0)` and ending at `(n - 1, m - 1)`.
    pub path: Vec<(usize, usize)>,
    pub total_cost: f64,
}

/// Executes a monotonic dynamic time warping between two dense series.
///
/// Local cost is the Euclidean distance between samples; steps are diagonal,
/// vertical or horizontal.
pub fn warping_path(reference: &[f64], learner: &[f64]) -> Result<DtwAlignment> {
    ensure_inputs(reference, learner)?;
    let cost = accumulate_costs(reference, learner);
    let (n, m) = (reference.len(), learner.len());
    let total_cost = cost[[n, m]];
    if !total_cost.is_finite() {
        return Err(PronunciationError::new(
            ErrorKind::AlignmentDegenerate,
            "failed to compute finite DTW alignment cost",
        ));
    }
    let path = backtrack(&cost, n, m)?;
    Ok(DtwAlignment { path, total_cost })
}

/// Z-score normalization; a constant series is only mean-centred.
pub fn znormalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let len = values.len() as f64;
    let mean = values.iter().sum::<f64>() / len;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        values.iter().map(|v| v - mean).collect()
    } else {
        values.iter().map(|v| (v - mean) / std_dev).collect()
    }
}

fn ensure_inputs(reference: &[f64], learner: &[f64]) -> Result<()> {
    if reference.is_empty() || learner.is_empty() {
        return Err(PronunciationError::new(
            ErrorKind::AlignmentDegenerate,
            format!(
                "DTW needs two non-empty series, got {} and {} samples",
                reference.len(),
                learner.len()
            ),
        ));
    }
    if reference.iter().chain(learner.iter()).any(|v| !v.is_finite()) {
        return Err(PronunciationError::new(
            ErrorKind::AlignmentDegenerate,
            "DTW input contains non-finite samples",
        ));
    }
    Ok(())
}

fn accumulate_costs(reference: &[f64], learner: &[f64]) -> Array2<f64> {
    let (n, m) = (reference.len(), learner.len());
    let mut dp = Array2::from_elem((n + 1, m + 1), f64::INFINITY);
    dp[[0, 0]] = 0.0;
    for i in 1..=n {
        for j in 1..=m {
            let local = (reference[i - 1] - learner[j - 1]).abs();
            let best = dp[[i - 1, j - 1]].min(dp[[i - 1, j]]).min(dp[[i, j - 1]]);
            dp[[i, j]] = local + best;
        }
    }
    dp
}

fn backtrack(dp: &Array2<f64>, n: usize, m: usize) -> Result<Vec<(usize, usize)>> {
    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 && j > 0 {
        path.push((i - 1, j - 1));
        if i == 1 && j == 1 {
            break;
        }
        let diagonal = dp[[i - 1, j - 1]];
        let up = dp[[i - 1, j]];
        let left = dp[[i, j - 1]];
        if diagonal <= up && diagonal <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    if path.last() != Some(&(0, 0)) {
        return Err(PronunciationError::new(
            ErrorKind::AlignmentDegenerate,
            "invalid DTW backtrack encountered",
        ));
    }
    path.reverse();
    Ok(path)
}
