pub mod features;
pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ToneConfig;
use crate::types::PitchTrack;

pub use features::ToneFeatures;

/// Mandarin tone category. Serialized as its number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ToneLabel {
    Neutral = 0,
    HighLevel = 1,
    Rising = 2,
    Dipping = 3,
    Falling = 4,
}

impl ToneLabel {
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl From<ToneLabel> for u8 {
    fn from(label: ToneLabel) -> Self {
        label.number()
    }
}

impl TryFrom<u8> for ToneLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Neutral),
            1 => Ok(Self::HighLevel),
            2 => Ok(Self::Rising),
            3 => Ok(Self::Dipping),
            4 => Ok(Self::Falling),
            other => Err(format!("tone must be between 0 and 4, got {other}")),
        }
    }
}

/// Classification of one pitch segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneObservation {
    pub label: ToneLabel,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<ToneFeatures>,
    pub rule: &'static str,
}

impl ToneObservation {
    fn unknown(label: ToneLabel) -> Self {
        Self {
            label,
            confidence: 0.0,
            features: None,
            rule: "insufficient_samples",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Partial,
    Mismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToneMatch {
    pub similarity: f64,
    pub is_match: bool,
    pub kind: MatchKind,
}

/// Detected versus expected tone of one syllable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyllableTone {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub expected: ToneLabel,
    pub detected: ToneObservation,
    pub comparison: ToneMatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToneAnalysis {
    pub syllables: Vec<SyllableTone>,
    /// Confidence- and importance-weighted similarity in [0, 1].
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ToneClassifier {
    config: ToneConfig,
}

impl ToneClassifier {
    pub fn new(config: ToneConfig) -> Self {
        Self { config }
    }

    /// Classifies a segment of Hz values sampled at `times`.
    pub fn classify(&self, values: &[f64], times: &[f64]) -> ToneObservation {
        let Some(features) = ToneFeatures::extract(values, times, self.config.min_span_octaves)
        else {
            return ToneObservation::unknown(ToneLabel::HighLevel);
        };
        let (label, confidence, rule) = rules::evaluate(&features, &self.config);
        ToneObservation {
            label,
            confidence,
            features: Some(features),
            rule,
        }
    }

    pub fn compare(&self, detected: ToneLabel, expected: ToneLabel) -> ToneMatch {
        if detected == expected {
            return ToneMatch {
                similarity: 1.0,
                is_match: true,
                kind: MatchKind::Exact,
            };
        }
        let similarity = tone_similarity(detected, expected);
        ToneMatch {
            similarity,
            is_match: false,
            kind: if similarity > 0.2 {
                MatchKind::Partial
            } else {
                MatchKind::Mismatch
            },
        }
    }

    /// Splits the voiced part of `track` into one equal-duration segment per
    /// expected tone and classifies each.
    pub fn analyze(&self, track: &PitchTrack, expected: &[ToneLabel]) -> ToneAnalysis {
        if expected.is_empty() {
            return ToneAnalysis::default();
        }
        let (times, values): (Vec<f64>, Vec<f64>) = track
            .samples()
            .iter()
            .filter_map(|s| s.frequency.map(|f| (s.time, f)))
            .unzip();
        let (first, last) = match (times.first(), times.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (0.0, 0.0),
        };
        let segment_len = (last - first) / expected.len() as f64;
        let count = expected.len();

        let syllables: Vec<SyllableTone> = expected
            .iter()
            .enumerate()
            .map(|(index, &expected)| {
                let is_last = index + 1 == count;
                let start = first + segment_len * index as f64;
                let end = if is_last { last } else { start + segment_len };
                // The final segment keeps its closing sample.
                let (seg_times, seg_values): (Vec<f64>, Vec<f64>) = times
                    .iter()
                    .zip(&values)
                    .filter(|(t, _)| **t >= start && (**t < end || (is_last && **t <= end)))
                    .map(|(t, v)| (*t, *v))
                    .unzip();
                let detected = if seg_values.len() < 2 {
                    ToneObservation::unknown(ToneLabel::Neutral)
                } else {
                    self.classify(&seg_values, &seg_times)
                };
                let comparison = self.compare(detected.label, expected);
                SyllableTone {
                    index,
                    start,
                    end,
                    expected,
                    detected,
                    comparison,
                }
            })
            .collect();
        let accuracy = self.accuracy(&syllables);
        debug!(syllables = syllables.len(), accuracy, "analyzed syllable tones");
        ToneAnalysis {
            syllables,
            accuracy,
        }
    }

    /// Σ similarity·confidence·weight / Σ weight over all syllables, where
    /// the weight is the importance of the expected tone.
    pub fn accuracy(&self, syllables: &[SyllableTone]) -> f64 {
        let (weighted, total_weight) =
            syllables
                .iter()
                .fold((0.0, 0.0), |(weighted, total), syllable| {
                    let weight = self.importance(syllable.expected);
                    (
                        weighted
                            + syllable.comparison.similarity
                                * syllable.detected.confidence
                                * weight,
                        total + weight,
                    )
                });
        if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn importance(&self, label: ToneLabel) -> f64 {
        let weights = &self.config.importance;
        match label {
            ToneLabel::Neutral => weights.neutral,
            ToneLabel::HighLevel => weights.high_level,
            ToneLabel::Rising => weights.rising,
            ToneLabel::Dipping => weights.dipping,
            ToneLabel::Falling => weights.falling,
        }
    }
}

/// Symmetric similarity of two different tones.
pub fn tone_similarity(a: ToneLabel, b: ToneLabel) -> f64 {
    let key = (a.number().min(b.number()), a.number().max(b.number()));
    match key {
        (x, y) if x == y => 1.0,
        (1, 2) => 0.3,
        (1, 3) | (1, 4) => 0.2,
        (2, 3) => 0.4,
        (2, 4) => 0.1,
        (3, 4) => 0.3,
        _ => 0.0,
    }
}
