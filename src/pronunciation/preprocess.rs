use tracing::debug;

use crate::pronunciation::{ErrorKind, PronunciationError, Result};
use crate::types::PitchTrack;

const MIN_VOICED_SAMPLES: usize = 2;
const TIME_EPSILON: f64 = 1e-9;

/// A pitch track made dense for alignment.
///
/// Covers the span from the first to the last voiced sample of the source;
/// interior gaps are filled by linear interpolation in time and `voiced`
/// keeps the original voicing of every retained position.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTrack {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    pub voiced: Vec<bool>,
    /// Time of the last sample of the source track, voiced or not.
    pub duration: f64,
    pub source_len: usize,
    pub valid_ratio: f64,
}

impl PreparedTrack {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Linear interpolation at `time`; `None` outside the voiced span.
    pub fn value_at(&self, time: f64) -> Option<f64> {
        let first = *self.times.first()?;
        let last = *self.times.last()?;
        if time < first - TIME_EPSILON || time > last + TIME_EPSILON {
            return None;
        }
        let upper = self.times.partition_point(|&t| t < time);
        if upper == 0 {
            return Some(self.values[0]);
        }
        if upper >= self.times.len() {
            return self.values.last().copied();
        }
        Some(lerp(
            self.times[upper - 1],
            self.values[upper - 1],
            self.times[upper],
            self.values[upper],
            time,
        ))
    }

    /// Like [`value_at`](Self::value_at), but `None` wherever the value would
    /// lean on a filled gap sample. Points between two originally voiced
    /// neighbours, or on a voiced sample, are kept.
    pub fn voiced_value_at(&self, time: f64) -> Option<f64> {
        let value = self.value_at(time)?;
        let upper = self.times.partition_point(|&t| t < time - TIME_EPSILON);
        let on_sample = self
            .times
            .get(upper)
            .is_some_and(|&t| (t - time).abs() <= TIME_EPSILON);
        let voiced = if on_sample {
            self.voiced[upper]
        } else {
            upper > 0 && upper < self.voiced.len() && self.voiced[upper - 1] && self.voiced[upper]
        };
        voiced.then_some(value)
    }

    /// Value at index `idx` if the source sample there was voiced.
    pub fn voiced_value(&self, idx: usize) -> Option<f64> {
        self.voiced
            .get(idx)
            .copied()
            .unwrap_or(false)
            .then(|| self.values[idx])
    }
}

/// Cleans raw pitch tracks before alignment.
#[derive(Debug, Default, Clone)]
pub struct PitchTrackPreprocessor {}

impl PitchTrackPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolates unvoiced gaps between voiced samples. Never extrapolates:
    /// leading and trailing unvoiced samples are dropped.
    pub fn prepare(&self, track: &PitchTrack) -> Result<PreparedTrack> {
        let samples = track.samples();
        let voiced_indices: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter_map(|(idx, sample)| sample.frequency.map(|_| idx))
            .collect();
        if voiced_indices.len() < MIN_VOICED_SAMPLES {
            return Err(PronunciationError::new(
                ErrorKind::InsufficientVoicing,
                format!(
                    "pitch track has {} voiced samples, at least {MIN_VOICED_SAMPLES} are required",
                    voiced_indices.len()
                ),
            ));
        }
        let first = voiced_indices[0];
        let last = voiced_indices[voiced_indices.len() - 1];
        let span = &samples[first..=last];

        let times: Vec<f64> = span.iter().map(|s| s.time).collect();
        let voiced: Vec<bool> = span.iter().map(|s| s.frequency.is_some()).collect();
        let values = fill_gaps(&times, &span.iter().map(|s| s.frequency).collect::<Vec<_>>());
        debug!(
            source_len = samples.len(),
            span_len = values.len(),
            gaps = voiced.iter().filter(|v| !**v).count(),
            "prepared pitch track"
        );
        Ok(PreparedTrack {
            times,
            values,
            voiced,
            duration: track.duration(),
            source_len: samples.len(),
            valid_ratio: track.valid_ratio(),
        })
    }
}

/// Fills `None` runs by interpolating between the surrounding voiced values.
/// The first and last entries must be voiced.
fn fill_gaps(times: &[f64], values: &[Option<f64>]) -> Vec<f64> {
    let mut filled = Vec::with_capacity(values.len());
    let mut previous: Option<usize> = None;
    for (idx, value) in values.iter().enumerate() {
        match value {
            Some(v) => {
                if let Some(prev) = previous {
                    for gap in (prev + 1)..idx {
                        filled.push(lerp(
                            times[prev],
                            filled[prev],
                            times[idx],
                            *v,
                            times[gap],
                        ));
                    }
                }
                filled.push(*v);
                previous = Some(idx);
            }
            None if previous.is_none() => filled.push(f64::NAN),
            None => {}
        }
    }
    filled
}

fn lerp(t0: f64, v0: f64, t1: f64, v1: f64, t: f64) -> f64 {
    let span = t1 - t0;
    if span.abs() < TIME_EPSILON {
        return v0;
    }
    let weight = (t - t0) / span;
    v0 + (v1 - v0) * weight
}
