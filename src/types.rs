//! Core pitch-track types shared by extraction, comparison and the CLI

use serde::{Deserialize, Serialize};

use crate::pronunciation::{ErrorKind, PronunciationError, Result};

/// A single point of a pitch track. `None` means the frame was unvoiced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    /// Seconds from the start of the utterance
    pub time: f64,
    /// Fundamental frequency in Hz
    pub frequency: Option<f64>,
}

/// Ordered pitch samples with strictly increasing times.
///
/// Frequencies that are zero, negative or non-finite are stored as unvoiced,
/// matching the convention of most F0 trackers which report 0 Hz for
/// unvoiced frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrackRecord", into = "TrackRecord")]
pub struct PitchTrack {
    samples: Vec<PitchSample>,
}

/// Column-oriented JSON form of a track.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackRecord {
    times: Vec<f64>,
    frequencies: Vec<Option<f64>>,
}

impl TryFrom<TrackRecord> for PitchTrack {
    type Error = PronunciationError;

    fn try_from(record: TrackRecord) -> Result<Self> {
        PitchTrack::from_parts(&record.times, &record.frequencies)
    }
}

impl From<PitchTrack> for TrackRecord {
    fn from(track: PitchTrack) -> Self {
        Self {
            times: track.times(),
            frequencies: track.frequencies(),
        }
    }
}

impl PitchTrack {
    pub fn new(samples: Vec<PitchSample>) -> Result<Self> {
        let mut cleaned = Vec::with_capacity(samples.len());
        let mut previous: Option<f64> = None;
        for (index, sample) in samples.into_iter().enumerate() {
            if !sample.time.is_finite() {
                return Err(PronunciationError::new(
                    ErrorKind::InvalidTrack,
                    format!("sample {index} has a non-finite time"),
                ));
            }
            if let Some(prev) = previous {
                if sample.time <= prev {
                    return Err(PronunciationError::new(
                        ErrorKind::InvalidTrack,
                        format!(
                            "sample {index} at {:.4}s does not follow {:.4}s",
                            sample.time, prev
                        ),
                    ));
                }
            }
            previous = Some(sample.time);
            cleaned.push(PitchSample {
                time: sample.time,
                frequency: sample.frequency.filter(|f| f.is_finite() && *f > 0.0),
            });
        }
        Ok(Self { samples: cleaned })
    }

    /// Builds a track from parallel time and frequency columns.
    pub fn from_parts(times: &[f64], frequencies: &[Option<f64>]) -> Result<Self> {
        if times.len() != frequencies.len() {
            return Err(PronunciationError::new(
                ErrorKind::InvalidTrack,
                format!(
                    "track has {} times but {} frequencies",
                    times.len(),
                    frequencies.len()
                ),
            ));
        }
        Self::new(
            times
                .iter()
                .zip(frequencies.iter())
                .map(|(&time, &frequency)| PitchSample { time, frequency })
                .collect(),
        )
    }

    /// Builds a track from raw Hz values where 0 marks an unvoiced frame.
    pub fn from_hz(times: &[f64], hz: &[f64]) -> Result<Self> {
        let frequencies: Vec<Option<f64>> = hz.iter().map(|&f| Some(f)).collect();
        Self::from_parts(times, &frequencies)
    }

    /// Builds a track sampled every `step` seconds starting at zero.
    pub fn uniform(step: f64, frequencies: &[Option<f64>]) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(PronunciationError::new(
                ErrorKind::InvalidTrack,
                format!("time step must be positive, got {step}"),
            ));
        }
        let times: Vec<f64> = (0..frequencies.len()).map(|i| i as f64 * step).collect();
        Self::from_parts(&times, frequencies)
    }

    pub fn samples(&self) -> &[PitchSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn frequencies(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.frequency).collect()
    }

    /// Frequencies of the voiced samples, in order.
    pub fn voiced_values(&self) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.frequency).collect()
    }

    pub fn voiced_count(&self) -> usize {
        self.samples.iter().filter(|s| s.frequency.is_some()).count()
    }

    /// Fraction of samples that carry a frequency; 0 for an empty track.
    pub fn valid_ratio(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.voiced_count() as f64 / self.samples.len() as f64
        }
    }

    /// Time of the last sample, or 0 for an empty track.
    pub fn duration(&self) -> f64 {
        self.samples.last().map(|s| s.time).unwrap_or(0.0)
    }

    /// Drops every sample later than `max_time`.
    pub fn truncated(&self, max_time: f64) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .copied()
                .take_while(|s| s.time <= max_time)
                .collect(),
        }
    }
}

/// How an [`AlignedPitchPair`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMethod {
    Dtw,
    Linear,
    #[default]
    None,
}

/// Two pitch curves resampled onto one shared time axis.
///
/// Positions are paired: `standard[i]` and `user[i]` belong to `times[i]`.
/// A position is `None` where the corresponding track has no voiced coverage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedPitchPair {
    pub times: Vec<f64>,
    pub standard: Vec<Option<f64>>,
    pub user: Vec<Option<f64>>,
    pub method: AlignmentMethod,
}

impl AlignedPitchPair {
    /// An empty pair; callers must treat it as non-comparable.
    pub fn empty(method: AlignmentMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values at positions where both curves are voiced.
    pub fn jointly_voiced(&self) -> (Vec<f64>, Vec<f64>) {
        self.standard
            .iter()
            .zip(self.user.iter())
            .filter_map(|(s, u)| match (s, u) {
                (Some(s), Some(u)) => Some((*s, *u)),
                _ => None,
            })
            .unzip()
    }

    pub fn jointly_voiced_count(&self) -> usize {
        self.standard
            .iter()
            .zip(self.user.iter())
            .filter(|(s, u)| s.is_some() && u.is_some())
            .count()
    }
}
